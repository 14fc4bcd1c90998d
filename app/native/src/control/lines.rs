//! Bounded line splitting for the control channel.

use crate::variables::sanitize_line;

/// Longest accepted control line, excluding the newline.
pub const MAX_LINE: usize = 8 * 1024;

/// Output of [`LineBuffer::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete line with non-printable bytes removed.
    Line(String),
    /// A line grew past [`MAX_LINE`].
    Overflow,
}

/// Accumulates raw bytes and yields complete lines.
///
/// After an overflow the rest of the offending line is dropped; reading
/// resumes after its newline.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    discarding: bool,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<LineEvent> {
        let mut events = Vec::new();

        for part in chunk.split_inclusive(|b| *b == b'\n') {
            let complete = part.last() == Some(&b'\n');
            let body = if complete { &part[..part.len() - 1] } else { part };

            if self.discarding {
                self.discarding = !complete;
                continue;
            }

            if self.buf.len() + body.len() > MAX_LINE {
                self.buf.clear();
                self.discarding = !complete;
                events.push(LineEvent::Overflow);
                continue;
            }

            self.buf.extend_from_slice(body);
            if complete {
                events.push(LineEvent::Line(sanitize_line(&std::mem::take(&mut self.buf))));
            }
        }

        events
    }
}
