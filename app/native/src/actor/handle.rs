//! Handle for talking to the controller actor.
//!
//! Cheap to clone; every producer (socket clients, the FIFO reader, signal
//! listeners, window watchers) holds its own copy.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::messages::{ControlMessage, ControlQuery, QueryResult};
use crate::controller::StartRequest;

/// Error types for actor communication.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// Failed to send message to actor.
    #[error("Failed to send message to controller: channel closed")]
    SendFailed,

    /// Failed to receive response from actor.
    #[error("Failed to receive response from controller: channel closed")]
    ReceiveFailed,

    /// Query timed out.
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

/// Handle for communicating with the controller actor.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    sender: mpsc::Sender<ControlMessage>,
}

impl ControllerHandle {
    pub(crate) const fn new(sender: mpsc::Sender<ControlMessage>) -> Self { Self { sender } }

    // ========================================================================
    // Fire-and-forget sending
    // ========================================================================

    /// Queues a message without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed or full.
    pub fn send(&self, msg: ControlMessage) -> Result<(), ActorError> {
        self.sender.try_send(msg).map_err(|_| ActorError::SendFailed)
    }

    /// Queues a message, waiting for buffer space.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub async fn send_async(&self, msg: ControlMessage) -> Result<(), ActorError> {
        self.sender.send(msg).await.map_err(|_| ActorError::SendFailed)
    }

    /// Whether the actor has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.sender.is_closed() }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Executes a query and waits for the result.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed, or
    /// [`ActorError::ReceiveFailed`] if the actor dropped the response.
    pub async fn query(&self, query: ControlQuery) -> Result<QueryResult, ActorError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(ControlMessage::Query { query, respond_to: tx })
            .await
            .map_err(|_| ActorError::SendFailed)?;

        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Executes a query with a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Timeout`] if no answer arrives in time, or any
    /// error from [`Self::query`].
    pub async fn query_timeout(&self, query: ControlQuery, timeout: Duration) -> Result<QueryResult, ActorError> {
        tokio::time::timeout(timeout, self.query(query))
            .await
            .map_err(|_| ActorError::Timeout(timeout))?
    }

    // ========================================================================
    // Convenience
    // ========================================================================

    /// Starts an explicit command.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn start(&self, name: &str, request: StartRequest) -> Result<QueryResult, ActorError> {
        self.query(ControlQuery::Start { name: name.to_string(), request }).await
    }

    /// Starts an explicit command with only argument values.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn start_with_arguments(
        &self,
        name: &str,
        arguments: HashMap<String, String>,
    ) -> Result<QueryResult, ActorError> {
        self.start(name, StartRequest { arguments, ..StartRequest::default() }).await
    }

    /// Stops a command or window by name.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn stop(&self, name: &str) -> Result<QueryResult, ActorError> {
        self.query(ControlQuery::Stop { name: name.to_string() }).await
    }

    /// Returns every display to its default layout.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn reset(&self) -> Result<QueryResult, ActorError> { self.query(ControlQuery::Reset).await }

    /// Lists commands and windows.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn list(&self) -> Result<QueryResult, ActorError> { self.query(ControlQuery::List).await }

    /// Active layouts and running entries.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn status(&self) -> Result<QueryResult, ActorError> { self.query(ControlQuery::Status).await }

    /// Layouts per display.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn layouts(&self) -> Result<QueryResult, ActorError> { self.query(ControlQuery::Layouts).await }

    /// Writes a variable and reports whether it changed.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn set_variable(&self, name: &str, value: &str) -> Result<QueryResult, ActorError> {
        self.query(ControlQuery::SetVariable { name: name.to_string(), value: value.to_string() }).await
    }

    /// Asks the actor to tear down and exit.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor is already gone.
    pub async fn shutdown(&self) -> Result<(), ActorError> { self.send_async(ControlMessage::Shutdown).await }
}
