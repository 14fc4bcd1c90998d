//! Messages accepted by the controller actor.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::controller::{DisplayLayouts, Listing, StartRequest, StatusView};
use crate::state::{DisplayId, WindowHandle};
use crate::supervisor::WindowInfo;
use crate::variables::SetOutcome;

/// Everything that can happen to the controller.
#[derive(Debug)]
pub enum ControlMessage {
    // ========================================================================
    // Control channel
    // ========================================================================
    /// `name=value` line from the socket or the FIFO.
    SetVariable { name: String, value: String },

    // ========================================================================
    // Operating system
    // ========================================================================
    /// SIGCHLD: at least one child changed state.
    ChildExited,
    /// SIGHUP: return displays to their defaults.
    Reset,

    // ========================================================================
    // Window manager
    // ========================================================================
    WindowCreated { display: DisplayId, window: WindowInfo },
    WindowDestroyed { display: DisplayId, handle: WindowHandle },

    // ========================================================================
    // Requests with a response
    // ========================================================================
    Query { query: ControlQuery, respond_to: oneshot::Sender<QueryResult> },

    /// Stop every managed process and exit.
    Shutdown,
}

impl ControlMessage {
    /// Message name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetVariable { .. } => "SetVariable",
            Self::ChildExited => "ChildExited",
            Self::Reset => "Reset",
            Self::WindowCreated { .. } => "WindowCreated",
            Self::WindowDestroyed { .. } => "WindowDestroyed",
            Self::Query { .. } => "Query",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// API request, also accepted as a JSON line on the control socket.
///
/// ```json
/// {"type": "start", "name": "play", "arguments": {"file": "intro.mp4"}, "fullscreen": true}
/// {"type": "status"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlQuery {
    Start {
        name: String,
        #[serde(flatten)]
        request: StartRequest,
    },
    Stop { name: String },
    Reset,
    List,
    Status,
    Layouts,
    SetVariable { name: String, value: String },
}

/// Response to a [`ControlQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum QueryResult {
    Done,
    Variable(SetOutcome),
    Listing(Listing),
    Status(StatusView),
    Layouts(Vec<DisplayLayouts>),
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_from_json() {
        let query: ControlQuery = serde_json::from_str(
            r#"{"type":"start","name":"play","arguments":{"file":"a.mp4"},"display":"side","fullscreen":true}"#,
        )
        .unwrap();
        let ControlQuery::Start { name, request } = query else { panic!("expected start") };
        assert_eq!(name, "play");
        assert_eq!(request.arguments.get("file").map(String::as_str), Some("a.mp4"));
        assert_eq!(request.display.as_deref(), Some("side"));
        assert_eq!(request.frame, None);
        assert!(request.fullscreen);

        let query: ControlQuery = serde_json::from_str(r#"{"type":"setVariable","name":"a","value":"1"}"#).unwrap();
        assert_eq!(query, ControlQuery::SetVariable { name: "a".into(), value: "1".into() });
    }

    #[test]
    fn test_start_without_options() {
        let query: ControlQuery = serde_json::from_str(r#"{"type":"start","name":"play"}"#).unwrap();
        assert_eq!(query, ControlQuery::Start { name: "play".into(), request: StartRequest::default() });
    }

    #[test]
    fn test_result_to_json() {
        let json = serde_json::to_string(&QueryResult::Variable(SetOutcome::Changed)).unwrap();
        assert_eq!(json, r#"{"type":"variable","data":"changed"}"#);
        let json = serde_json::to_string(&QueryResult::Done).unwrap();
        assert_eq!(json, r#"{"type":"done"}"#);
    }

    #[test]
    fn test_message_names() {
        assert_eq!(ControlMessage::ChildExited.name(), "ChildExited");
        assert_eq!(ControlMessage::Shutdown.name(), "Shutdown");
    }
}
