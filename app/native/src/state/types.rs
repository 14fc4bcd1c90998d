//! Display, layout and frame types.
//!
//! These types form a small relational structure:
//! - `Display` is one window-manager screen set (one X `DISPLAY`)
//! - `Layout` is a named partition of a display into frames
//! - `Frame` is one region of a layout, identified by its frame number
//!
//! Relations:
//! - `Layout.display` → `Display.id`
//! - `Display.default_layout` / `Display.current_layout` → `Layout` by id

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Index of a display in the display table.
pub type DisplayId = usize;

/// Index of a layout in the layout table.
pub type LayoutId = usize;

/// Window-manager window handle (the X window id).
pub type WindowHandle = u64;

/// Frame number inside a layout.
pub type FrameId = u32;

// ============================================================================
// Geometry Types
// ============================================================================

/// Bounding box of a frame in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Check if this rectangle has a non-zero area.
    #[must_use]
    pub const fn is_valid(&self) -> bool { self.width > 0 && self.height > 0 }
}

/// Geometry of the screen owning a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
    /// Screen number inside the X display.
    pub id: u32,
}

// ============================================================================
// Layout Types
// ============================================================================

/// One region of a layout that hosts at most one window at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub id: FrameId,
    pub bbox: Rect,
    pub screen: ScreenGeometry,
}

/// A named set of frames for one display. Immutable after load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    pub display: DisplayId,
    pub frames: SmallVec<[Frame; 4]>,
}

impl Layout {
    /// Looks up a frame by its number.
    #[must_use]
    pub fn frame(&self, id: FrameId) -> Option<&Frame> { self.frames.iter().find(|f| f.id == id) }
}

// ============================================================================
// Display Type
// ============================================================================

/// One window-manager screen set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Display {
    pub id: DisplayId,
    /// Name used by the automation script and the control API.
    pub name: String,
    /// X display string handed to children as `DISPLAY`.
    pub identifier: String,
    pub default_layout: Option<LayoutId>,
    pub current_layout: Option<LayoutId>,
    /// Number of foreground commands currently owning this display.
    pub busy: usize,
    /// Adopt pre-existing windows at startup. Consumed once.
    pub repatriate: bool,
}

impl Display {
    /// Creates an idle display with no layouts.
    #[must_use]
    pub fn new(id: DisplayId, name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            identifier: identifier.into(),
            default_layout: None,
            current_layout: None,
            busy: 0,
            repatriate: false,
        }
    }

    /// Whether automation may change this display.
    #[must_use]
    pub const fn is_busy(&self) -> bool { self.busy > 0 }

    /// Takes a foreground lock.
    pub const fn lock(&mut self) { self.busy += 1; }

    /// Releases a foreground lock. Never underflows.
    pub const fn unlock(&mut self) { self.busy = self.busy.saturating_sub(1); }
}
