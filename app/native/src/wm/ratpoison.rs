//! ratpoison backend.
//!
//! Every request runs `ratpoison -d <DISPLAY> -c "<command>"` and waits for it
//! with a deadline. A request that outlives the deadline is killed and
//! reported as [`WmError::Timeout`].
//!
//! | Operation          | ratpoison command                     |
//! |--------------------|---------------------------------------|
//! | activate layout    | `sfrestore <frame dump>`              |
//! | select frame       | `fselect <n>`                         |
//! | enter fullscreen   | `only`                                |
//! | rollback           | `undo`                                |
//! | fetch live layout  | `sfdump`                              |
//! | list windows       | `windows %i\t%p\t%a\t%c\t%t`          |

use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use super::frames::encode_layout;
use super::{WindowManager, WmError};
use crate::platform::binary::resolve_binary;
use crate::state::{Display, FrameId, Layout, WindowHandle};
use crate::supervisor::WindowInfo;

/// Window list format: id, pid, app name, class, title.
const WINDOW_FORMAT: &str = "%i\t%p\t%a\t%c\t%t";

/// Client for one ratpoison binary. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RatpoisonClient {
    binary: PathBuf,
    timeout: Duration,
}

impl RatpoisonClient {
    /// Creates a client. The binary is resolved once; if lookup fails the bare
    /// name is kept and left to `PATH` at call time.
    #[must_use]
    pub fn new(binary: &str, timeout: Duration) -> Self {
        let binary = resolve_binary(binary).unwrap_or_else(|err| {
            tracing::warn!(binary, error = %err, "window manager client not found, relying on PATH");
            PathBuf::from(binary)
        });
        Self { binary, timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration { self.timeout }

    /// Runs one command and returns its standard output.
    fn run(&self, display: &Display, command: &str) -> Result<String, WmError> {
        let verb = command.split_whitespace().next().unwrap_or_default().to_string();

        let child = Command::new(&self.binary)
            .arg("-d")
            .arg(&display.identifier)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let pid = child.id();

        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("rpcd-wm-request".to_string())
            .spawn(move || {
                let _ = tx.send(child.wait_with_output());
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => Self::check(&verb, result?),
            Err(_) => {
                // SAFETY: kill has no memory-safety preconditions.
                #[allow(clippy::cast_possible_wrap)]
                unsafe {
                    libc::kill(pid as libc::pid_t, libc::SIGKILL);
                }
                let identifier = &display.identifier;
                tracing::error!(command = %verb, display = %identifier, timeout = ?self.timeout, "window manager request timed out");
                Err(WmError::Timeout { command: verb, timeout: self.timeout })
            }
        }
    }

    fn check(verb: &str, output: Output) -> Result<String, WmError> {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() || !stderr.is_empty() {
            let message = if stderr.is_empty() { output.status.to_string() } else { stderr };
            return Err(WmError::CommandFailed { command: verb.to_string(), message });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn parse_handle(text: &str) -> Option<WindowHandle> {
    let text = text.trim();
    text.strip_prefix("0x")
        .map_or_else(|| text.parse().ok(), |hex| WindowHandle::from_str_radix(hex, 16).ok())
}

/// Parses the output of the `windows` listing.
///
/// Lines that do not carry a window id (such as "No managed windows") are
/// skipped.
#[must_use]
pub fn parse_window_list(output: &str) -> Vec<WindowInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(5, '\t');
            let handle = parse_handle(fields.next()?)?;
            let pid = fields.next().and_then(|p| p.trim().parse::<u32>().ok()).filter(|p| *p > 0);
            Some(WindowInfo {
                handle,
                pid,
                app_name: fields.next().unwrap_or_default().to_string(),
                class: fields.next().unwrap_or_default().to_string(),
                title: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

impl WindowManager for RatpoisonClient {
    fn activate_layout(
        &mut self,
        display: &Display,
        layout: &Layout,
        window_for: &dyn Fn(FrameId) -> Option<WindowHandle>,
    ) -> Result<(), WmError> {
        let encoded = encode_layout(layout, window_for);
        self.run(display, &format!("sfrestore {encoded}"))?;
        let name = &display.name;
        tracing::debug!(display = %name, layout = %layout.name, "activated layout");
        Ok(())
    }

    fn select_frame(&mut self, display: &Display, frame: FrameId) -> Result<(), WmError> {
        self.run(display, &format!("fselect {frame}")).map(drop)
    }

    fn enter_fullscreen(&mut self, display: &Display) -> Result<(), WmError> {
        self.run(display, "only").map(drop)
    }

    fn rollback_fullscreen(&mut self, display: &Display) -> Result<(), WmError> {
        self.run(display, "undo").map(drop)
    }

    fn fetch_live_layout(&mut self, display: &Display) -> Result<String, WmError> {
        self.run(display, "sfdump")
    }

    fn list_windows(&mut self, display: &Display) -> Result<Vec<WindowInfo>, WmError> {
        let output = self.run(display, &format!("windows {WINDOW_FORMAT}"))?;
        Ok(parse_window_list(&output))
    }
}
