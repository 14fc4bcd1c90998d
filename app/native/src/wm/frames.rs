//! Frame dump encoding.
//!
//! ratpoison describes a frame set as comma-separated frame records:
//!
//! ```text
//! (frame :number 0 :x 0 :y 0 :width 960 :height 1080 :screenw 1920 :screenh 1080 :window 4194310) 0,
//! (frame :number 1 :x 960 :y 0 :width 960 :height 1080 :screenw 1920 :screenh 1080 :window 0) 0
//! ```
//!
//! The trailing number is the screen. `sfrestore` takes this format and
//! `sfdump` produces it (with a few extra keys we ignore).

use crate::state::{FrameId, Layout, WindowHandle};

/// Encodes a layout for `sfrestore`, placing `window_for(frame)` in each frame.
#[must_use]
pub fn encode_layout(layout: &Layout, window_for: impl Fn(FrameId) -> Option<WindowHandle>) -> String {
    layout
        .frames
        .iter()
        .map(|frame| {
            format!(
                "(frame :number {} :x {} :y {} :width {} :height {} :screenw {} :screenh {} :window {}) {}",
                frame.id,
                frame.bbox.x,
                frame.bbox.y,
                frame.bbox.width,
                frame.bbox.height,
                frame.screen.width,
                frame.screen.height,
                window_for(frame.id).unwrap_or(0),
                frame.screen.id,
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn keyword_value(record: &str, key: &str) -> Option<u64> {
    let mut words = record.split_whitespace();
    while let Some(word) = words.next() {
        if word == key {
            return words.next().and_then(|v| v.trim_end_matches(')').parse().ok());
        }
    }
    None
}

/// Extracts `(frame, window)` pairs with a window from a frame dump.
///
/// Malformed records are skipped.
#[must_use]
pub fn parse_frame_windows(dump: &str) -> Vec<(FrameId, WindowHandle)> {
    dump.split(',')
        .filter_map(|record| {
            let frame = keyword_value(record, ":number")?;
            let window = keyword_value(record, ":window")?;
            let frame = FrameId::try_from(frame).ok()?;
            (window != 0).then_some((frame, window))
        })
        .collect()
}
