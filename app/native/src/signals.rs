//! OS signal handling.
//!
//! Signals are turned into controller messages; nothing runs in signal
//! context.
//!
//! | Signal                     | Message        |
//! |----------------------------|----------------|
//! | SIGCHLD                    | `ChildExited`  |
//! | SIGHUP                     | `Reset`        |
//! | SIGINT, SIGTERM, SIGQUIT   | `Shutdown`     |

use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;

use crate::actor::{ControlMessage, ControllerHandle};

/// Installs the handlers and forwards signals until shutdown is requested.
///
/// Handlers are registered before this returns, so no signal delivered after
/// the call is lost.
///
/// # Errors
///
/// Returns the I/O error if a handler cannot be registered.
pub fn spawn(handle: ControllerHandle) -> std::io::Result<JoinHandle<()>> {
    let mut sigchld = signal(SignalKind::child())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                _ = sigchld.recv() => ControlMessage::ChildExited,
                _ = sighup.recv() => {
                    tracing::info!("SIGHUP received, resetting");
                    ControlMessage::Reset
                }
                _ = sigint.recv() => shutdown("SIGINT"),
                _ = sigterm.recv() => shutdown("SIGTERM"),
                _ = sigquit.recv() => shutdown("SIGQUIT"),
            };

            let last = matches!(msg, ControlMessage::Shutdown);
            if handle.send_async(msg).await.is_err() || last {
                return;
            }
        }
    }))
}

fn shutdown(name: &str) -> ControlMessage {
    tracing::info!(signal = name, "shutdown requested");
    ControlMessage::Shutdown
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    /// Children spawned by parallel tests also raise SIGCHLD, so wait for
    /// the first message of the wanted kind.
    async fn next_matching(rx: &mut mpsc::Receiver<ControlMessage>, want: fn(&ControlMessage) -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(msg) = rx.recv().await {
                if want(&msg) {
                    return;
                }
            }
            panic!("signal task exited");
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_hangup_and_child_signals() {
        let (sender, mut rx) = mpsc::channel(8);
        let _task = spawn(ControllerHandle::new(sender)).unwrap();

        // SAFETY: raising a signal that has a registered handler.
        unsafe {
            libc::raise(libc::SIGHUP);
        }
        next_matching(&mut rx, |m| matches!(m, ControlMessage::Reset)).await;

        // SAFETY: as above.
        unsafe {
            libc::raise(libc::SIGCHLD);
        }
        next_matching(&mut rx, |m| matches!(m, ControlMessage::ChildExited)).await;
    }
}
