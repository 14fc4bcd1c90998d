//! Controller actor.
//!
//! The actor owns the [`Controller`] and processes messages sequentially, so
//! no state is ever shared between tasks. Producers hold a
//! [`ControllerHandle`] and only send messages.
//!
//! After every message the actor performs at most one reconcile run if the
//! message requested one.
//!
//! # Panic Recovery
//!
//! A panic while handling a message is caught and logged; the actor keeps
//! processing. State may be partially inconsistent afterwards but managed
//! processes stay supervised.

mod handle;
mod messages;

use std::panic::{AssertUnwindSafe, catch_unwind};

pub use handle::{ActorError, ControllerHandle};
pub use messages::{ControlMessage, ControlQuery, QueryResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::controller::Controller;

/// Channel buffer size for the controller actor.
const CHANNEL_BUFFER_SIZE: usize = 256;

/// The task that owns the controller.
pub struct ControllerActor {
    controller: Controller,
    receiver: mpsc::Receiver<ControlMessage>,
}

impl ControllerActor {
    /// Spawns the actor on the current runtime.
    ///
    /// The returned join handle completes after a shutdown message (or once
    /// every handle is dropped) and teardown of all managed processes.
    #[must_use]
    pub fn spawn(controller: Controller) -> (ControllerHandle, JoinHandle<()>) {
        tracing::debug!("spawning controller actor");
        let (sender, receiver) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let actor = Self { controller, receiver };
        let task = tokio::spawn(actor.run());
        (ControllerHandle::new(sender), task)
    }

    async fn run(mut self) {
        tracing::trace!("controller message loop starting");

        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, ControlMessage::Shutdown) {
                tracing::info!("controller received shutdown");
                break;
            }

            let msg_name = msg.name();
            let result = catch_unwind(AssertUnwindSafe(|| {
                self.handle_message(msg);
                self.reconcile();
            }));

            if let Err(panic_info) = result {
                let panic_msg = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());

                tracing::error!(message = msg_name, panic = %panic_msg, "controller recovered from panic, state may be inconsistent");
            }
        }

        // Teardown sleeps between rounds, so it runs on the blocking pool.
        let mut controller = self.controller;
        if let Err(err) = tokio::task::spawn_blocking(move || controller.shutdown()).await {
            tracing::error!(error = %err, "controller teardown failed");
        }
        tracing::debug!("controller actor exited");
    }

    fn reconcile(&mut self) {
        if let Err(err) = self.controller.run_if_pending() {
            tracing::error!(error = %err, "reconcile aborted");
        }
    }

    fn handle_message(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::SetVariable { name, value } => {
                self.controller.set_variable(&name, &value);
            }
            ControlMessage::ChildExited => {
                self.controller.child_exited();
            }
            ControlMessage::Reset => {
                if let Err(err) = self.controller.reset() {
                    tracing::error!(error = %err, "reset failed");
                }
            }
            ControlMessage::WindowCreated { display, window } => {
                self.controller.window_created(display, &window);
            }
            ControlMessage::WindowDestroyed { display, handle } => {
                self.controller.window_destroyed(display, handle);
            }
            ControlMessage::Query { query, respond_to } => {
                let result = self.handle_query(query);
                if respond_to.send(result).is_err() {
                    tracing::debug!("query requester went away");
                }
            }
            ControlMessage::Shutdown => {}
        }
    }

    fn handle_query(&mut self, query: ControlQuery) -> QueryResult {
        let outcome = match query {
            ControlQuery::Start { name, request } => {
                self.controller.start_command(&name, &request).map(|()| QueryResult::Done)
            }
            ControlQuery::Stop { name } => self.controller.stop(&name).map(|()| QueryResult::Done),
            ControlQuery::Reset => self.controller.reset().map(|()| QueryResult::Done),
            ControlQuery::List => Ok(QueryResult::Listing(self.controller.list())),
            ControlQuery::Status => Ok(QueryResult::Status(self.controller.status())),
            ControlQuery::Layouts => Ok(QueryResult::Layouts(self.controller.layouts())),
            ControlQuery::SetVariable { name, value } => {
                Ok(QueryResult::Variable(self.controller.set_variable(&name, &value)))
            }
        };

        outcome.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "request failed");
            QueryResult::Error(err.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::controller::tests::{fixture, window};
    use crate::platform::Signal;
    use crate::supervisor::WindowMode;
    use crate::variables::SetOutcome;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_status_query() {
        let (controller, _launcher, _wm) = fixture(&[], &[]);
        let (handle, _task) = ControllerActor::spawn(controller);

        let QueryResult::Status(status) = handle.status().await.unwrap() else { panic!("expected status") };
        assert_eq!(status.displays[0].name, "main");
        assert!(status.running.is_empty());
    }

    #[tokio::test]
    async fn test_variable_write_drives_reconcile() {
        let (mut controller, launcher, _wm) =
            fixture(&["if show = \"1\", assign clock 1"], &[("clock", WindowMode::Lazy)]);
        controller.cold_start().unwrap();
        let (handle, _task) = ControllerActor::spawn(controller);

        handle.send_async(ControlMessage::SetVariable { name: "show".into(), value: "1".into() }).await.unwrap();
        // Queries are answered in order, so the write has been handled.
        handle.query_timeout(ControlQuery::Status, TIMEOUT).await.unwrap();
        assert_eq!(launcher.launches().len(), 1);

        let result = handle.set_variable("show", "1").await.unwrap();
        assert_eq!(result, QueryResult::Variable(SetOutcome::Unchanged));
    }

    #[tokio::test]
    async fn test_unknown_command_is_reported() {
        let (controller, _launcher, _wm) = fixture(&[], &[]);
        let (handle, _task) = ControllerActor::spawn(controller);

        let result = handle.stop("nothing").await.unwrap();
        assert!(matches!(result, QueryResult::Error(ref message) if message.contains("nothing")));
    }

    #[tokio::test]
    async fn test_window_and_exit_events() {
        let (controller, launcher, _wm) = fixture(&[], &[]);
        let (handle, _task) = ControllerActor::spawn(controller);

        assert_eq!(handle.start("play", crate::controller::StartRequest::default()).await.unwrap(), QueryResult::Done);
        let pid = launcher.last_pid();
        handle.send_async(ControlMessage::WindowCreated { display: 0, window: window(9, Some(pid)) }).await.unwrap();

        launcher.exit(pid);
        handle.send_async(ControlMessage::ChildExited).await.unwrap();

        let QueryResult::Status(status) = handle.status().await.unwrap() else { panic!("expected status") };
        assert!(status.running.is_empty());
        assert!(!status.displays[0].busy);
    }

    #[tokio::test]
    async fn test_shutdown_tears_down() {
        let (controller, launcher, _wm) = fixture(&[], &[]);
        launcher.exit_on(Signal::Terminate);
        let (handle, task) = ControllerActor::spawn(controller);

        handle.start("play", crate::controller::StartRequest::default()).await.unwrap();
        handle.shutdown().await.unwrap();
        tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();

        assert_eq!(launcher.signals(), vec![(launcher.last_pid(), Signal::Terminate)]);
        assert!(handle.is_closed());
        assert!(matches!(handle.status().await, Err(ActorError::SendFailed)));
    }

    #[tokio::test]
    async fn test_teardown_does_not_stall_runtime() {
        let (mut controller, launcher, _wm) = fixture(&[], &[]);
        // The fake child ignores every signal, so teardown runs all its rounds.
        controller.set_teardown_poll(Duration::from_millis(10));
        let (handle, task) = ControllerActor::spawn(controller);
        handle.start("play", crate::controller::StartRequest::default()).await.unwrap();

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(5));
            loop {
                interval.tick().await;
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        let before = ticks.load(Ordering::Relaxed);
        handle.shutdown().await.unwrap();
        tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
        ticker.abort();

        assert!(ticks.load(Ordering::Relaxed) - before >= 10);
        assert!(!launcher.signals().is_empty());
    }
}
