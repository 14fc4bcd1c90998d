//! Window watcher.
//!
//! ratpoison has no event stream, so each display is polled: the window list
//! is fetched on the blocking pool, compared with the previous poll, and the
//! differences are sent to the controller as create/destroy messages.

use std::collections::HashSet;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::WindowManager;
use crate::actor::{ControlMessage, ControllerHandle};
use crate::state::{Display, WindowHandle};
use crate::supervisor::WindowInfo;

/// Polls one display for window changes.
pub struct WindowWatcher<W> {
    wm: W,
    display: Display,
    interval: Duration,
    known: HashSet<WindowHandle>,
    handle: ControllerHandle,
}

impl<W> WindowWatcher<W>
where
    W: WindowManager + Clone + 'static,
{
    /// Creates a watcher. Windows in `baseline` are treated as already seen.
    pub fn new(
        wm: W,
        display: Display,
        interval: Duration,
        baseline: impl IntoIterator<Item = WindowHandle>,
        handle: ControllerHandle,
    ) -> Self {
        Self { wm, display, interval, known: baseline.into_iter().collect(), handle }
    }

    /// Runs the watcher until the controller goes away.
    pub fn spawn(self) -> JoinHandle<()> { tokio::spawn(self.run()) }

    async fn run(mut self) {
        tracing::debug!(display = %self.display.name, interval = ?self.interval, "window watcher started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failing = false;

        loop {
            ticker.tick().await;
            if self.handle.is_closed() {
                break;
            }

            let mut wm = self.wm.clone();
            let display = self.display.clone();
            let listed = match tokio::task::spawn_blocking(move || wm.list_windows(&display)).await {
                Ok(listed) => listed,
                Err(err) => {
                    tracing::error!(display = %self.display.name, error = %err, "window poll task failed");
                    continue;
                }
            };

            let windows = match listed {
                Ok(windows) => {
                    if std::mem::take(&mut failing) {
                        tracing::info!(display = %self.display.name, "window polling recovered");
                    }
                    windows
                }
                Err(err) => {
                    if !failing {
                        tracing::warn!(display = %self.display.name, error = %err, "window polling failed");
                        failing = true;
                    }
                    continue;
                }
            };

            for msg in self.diff(windows) {
                if self.handle.send_async(msg).await.is_err() {
                    tracing::debug!(display = %self.display.name, "controller gone, window watcher exiting");
                    return;
                }
            }
        }
    }

    /// Updates the known set and returns the messages describing the change.
    ///
    /// Destroyed windows are reported before created ones so a recycled
    /// handle is released before it is matched again.
    fn diff(&mut self, windows: Vec<WindowInfo>) -> Vec<ControlMessage> {
        let current: HashSet<WindowHandle> = windows.iter().map(|w| w.handle).collect();
        let display = self.display.id;

        let mut messages: Vec<ControlMessage> = self
            .known
            .difference(&current)
            .map(|handle| ControlMessage::WindowDestroyed { display, handle: *handle })
            .collect();

        messages.extend(
            windows
                .into_iter()
                .filter(|w| !self.known.contains(&w.handle))
                .map(|window| ControlMessage::WindowCreated { display, window }),
        );

        self.known = current;
        messages
    }
}
