//! Window manager access.
//!
//! The controller talks to the window manager through [`WindowManager`]. Every
//! call is a blocking request/response with an explicit timeout; callers run
//! them inline and treat a timeout like any other failure.
//!
//! - [`ratpoison`] - implementation driving `ratpoison -c`
//! - [`frames`] - frame dump encoding for `sfrestore` / `sfdump`
//! - [`watcher`] - polling task turning window lists into create/destroy events

pub mod frames;
pub mod ratpoison;
pub mod watcher;

use std::time::Duration;

pub use ratpoison::RatpoisonClient;
use thiserror::Error;

use crate::state::{Display, FrameId, Layout, WindowHandle};
use crate::supervisor::WindowInfo;

/// Errors from window manager requests.
#[derive(Debug, Error)]
pub enum WmError {
    /// The window manager rejected or failed the command.
    #[error("window manager command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// No response within the deadline.
    #[error("window manager command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The client process could not be run.
    #[error("failed to run window manager client: {0}")]
    Io(#[from] std::io::Error),

    /// The response could not be understood.
    #[error("malformed window manager response: {0}")]
    Malformed(String),
}

/// Synchronous window manager surface used by the controller.
pub trait WindowManager: Send {
    /// Replaces the display's frame set with `layout`, putting
    /// `window_for(frame)` into each frame.
    ///
    /// # Errors
    ///
    /// Returns [`WmError`] when the layout could not be applied.
    fn activate_layout(
        &mut self,
        display: &Display,
        layout: &Layout,
        window_for: &dyn Fn(FrameId) -> Option<WindowHandle>,
    ) -> Result<(), WmError>;

    /// Focuses a frame so the next window lands there.
    ///
    /// # Errors
    ///
    /// Returns [`WmError`] on failure.
    fn select_frame(&mut self, display: &Display, frame: FrameId) -> Result<(), WmError>;

    /// Collapses the display to a single frame.
    ///
    /// # Errors
    ///
    /// Returns [`WmError`] on failure.
    fn enter_fullscreen(&mut self, display: &Display) -> Result<(), WmError>;

    /// Undoes the last frame change (leaves fullscreen).
    ///
    /// # Errors
    ///
    /// Returns [`WmError`] on failure.
    fn rollback_fullscreen(&mut self, display: &Display) -> Result<(), WmError>;

    /// Returns the raw frame dump of the live layout.
    ///
    /// # Errors
    ///
    /// Returns [`WmError`] on failure.
    fn fetch_live_layout(&mut self, display: &Display) -> Result<String, WmError>;

    /// Lists the windows currently managed on the display.
    ///
    /// # Errors
    ///
    /// Returns [`WmError`] on failure.
    fn list_windows(&mut self, display: &Display) -> Result<Vec<WindowInfo>, WmError>;
}
