//! Control channel.
//!
//! Two transports feed the controller with newline-terminated lines:
//!
//! - [`socket`] - a Unix stream socket; clients may also send JSON requests
//!   and receive one JSON response line per request
//! - [`fifo`] - a named pipe for `echo name=value > fifo` style writers
//!
//! A plain line is a variable write, `name=value`. Lines starting with `{`
//! are parsed as [`ControlQuery`](crate::actor::ControlQuery).

pub mod fifo;
mod lines;
pub mod socket;

pub use lines::{LineBuffer, LineEvent, MAX_LINE};

use crate::actor::{ControlMessage, ControlQuery, ControllerHandle, QueryResult};
use crate::variables::parse_assignment;

/// Handles one sanitized line. Returns the response to write back, if any.
pub async fn dispatch(line: &str, handle: &ControllerHandle) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.starts_with('{') {
        let result = match serde_json::from_str::<ControlQuery>(line) {
            Ok(query) => handle
                .query(query)
                .await
                .unwrap_or_else(|err| QueryResult::Error(err.to_string())),
            Err(err) => {
                tracing::warn!(error = %err, "malformed control request");
                QueryResult::Error(format!("malformed request: {err}"))
            }
        };
        return match serde_json::to_string(&result) {
            Ok(json) => Some(json),
            Err(err) => {
                tracing::error!(error = %err, "failed to encode control response");
                None
            }
        };
    }

    let Some((name, value)) = parse_assignment(line) else {
        tracing::warn!(line, "ignoring control line without name=value");
        return None;
    };

    let msg = ControlMessage::SetVariable { name: name.to_string(), value: value.to_string() };
    if handle.send_async(msg).await.is_err() {
        tracing::debug!("controller gone, dropping variable write");
    }
    None
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn test_assignment_line() {
        let (sender, mut rx) = mpsc::channel(4);
        let handle = ControllerHandle::new(sender);

        assert_eq!(dispatch("mode=a=b", &handle).await, None);
        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, ControlMessage::SetVariable { ref name, ref value } if name == "mode" && value == "a=b"));
    }

    #[tokio::test]
    async fn test_ignored_lines() {
        let (sender, mut rx) = mpsc::channel(4);
        let handle = ControllerHandle::new(sender);

        assert_eq!(dispatch("   ", &handle).await, None);
        assert_eq!(dispatch("no assignment", &handle).await, None);
        assert_eq!(dispatch("=value", &handle).await, None);
        drop(handle);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_request() {
        let (sender, _rx) = mpsc::channel(4);
        let handle = ControllerHandle::new(sender);

        let response = dispatch("{\"type\":\"launch\"}", &handle).await.unwrap();
        assert!(response.starts_with(r#"{"type":"error","data":"malformed request"#));
    }
}
