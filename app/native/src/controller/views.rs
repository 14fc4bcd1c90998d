//! Serializable snapshots returned to API callers.

use serde::Serialize;

use crate::state::FrameId;
use crate::supervisor::{ArgumentSpec, Lifecycle, WindowMode};

/// One explicit command as advertised to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandView {
    pub name: String,
    pub description: Option<String>,
    pub windows: bool,
    pub arguments: Vec<ArgumentSpec>,
    pub lifecycle: Lifecycle,
}

/// One automation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowView {
    pub name: String,
    pub mode: WindowMode,
    pub lifecycle: Lifecycle,
    pub display: String,
    pub frame: Option<FrameId>,
}

/// Commands and windows known to the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub commands: Vec<CommandView>,
    pub windows: Vec<WindowView>,
}

/// Live state of one display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayView {
    pub name: String,
    pub identifier: String,
    pub layout: Option<String>,
    pub busy: bool,
}

/// Answer to a status request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub displays: Vec<DisplayView>,
    pub running: Vec<String>,
}

/// Layouts declared for one display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayLayouts {
    pub display: String,
    pub layouts: Vec<String>,
    pub default_layout: Option<String>,
    pub current_layout: Option<String>,
}
