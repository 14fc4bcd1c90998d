//! Configuration file types.
//!
//! The file is JSONC (JSON with `//` and `/* */` comments) with camelCase
//! keys. Every section is optional except `displays`, which must name at
//! least one display.

use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::platform::path::{default_socket_path, expand_and_resolve};
use crate::supervisor::{ArgumentKind, WindowMode};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RpcdConfig {
    /// Optional JSON Schema reference for editor support.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Control socket and FIFO locations.
    pub control: ControlConfig,

    /// Window manager client settings.
    pub window_manager: WindowManagerConfig,

    /// Displays under control. Display 0 is the first entry.
    pub displays: Vec<DisplayConfig>,

    /// Frame layouts, each bound to one display.
    pub layouts: Vec<LayoutConfig>,

    /// Variables the automation script can read.
    pub variables: Vec<VariableConfig>,

    /// Automation windows placed by the script.
    pub windows: Vec<WindowConfig>,

    /// Explicit commands started through the control API.
    pub commands: Vec<CommandConfig>,

    /// Automation script, one statement per line.
    ///
    /// Blank lines and lines starting with `#` or `;` are ignored.
    pub automation: Vec<String>,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Control channel settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlConfig {
    /// Unix socket path. Defaults to `$XDG_RUNTIME_DIR/rpcd/control.sock`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,

    /// Optional named pipe accepting `name=value` lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fifo: Option<String>,
}

impl ControlConfig {
    /// Resolved socket path; relative paths are anchored at `base_dir`.
    #[must_use]
    pub fn socket_path(&self, base_dir: &Path) -> PathBuf {
        self.socket
            .as_deref()
            .map(|p| expand_and_resolve(p, base_dir))
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(default_socket_path)
    }

    /// Resolved FIFO path, if configured.
    #[must_use]
    pub fn fifo_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.fifo.as_deref().map(|p| expand_and_resolve(p, base_dir)).filter(|p| !p.as_os_str().is_empty())
    }
}

/// Window manager client settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowManagerConfig {
    /// ratpoison executable, by name or path.
    pub binary: String,

    /// Deadline for one window manager request, in milliseconds.
    pub timeout_ms: u64,

    /// Interval between window list polls, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for WindowManagerConfig {
    fn default() -> Self { Self { binary: "ratpoison".to_string(), timeout_ms: 2000, poll_interval_ms: 500 } }
}

impl WindowManagerConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }
}

/// One display.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayConfig {
    /// Name used by the script and the control API.
    pub name: String,

    /// X display string, e.g. `:0`.
    pub display: String,

    /// Layout loaded on reset and reported before any activation.
    /// Defaults to the first layout declared for the display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_layout: Option<String>,

    /// Adopt windows already on screen at startup.
    pub repatriate: bool,
}

/// One layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub name: String,

    /// Display name or index.
    pub display: String,

    pub frames: Vec<FrameConfig>,
}

/// One frame of a layout, in pixels.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct FrameConfig {
    /// Frame number referenced by `assign`.
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub screen_width: u32,
    pub screen_height: u32,
    /// Screen number inside the X display.
    pub screen: u32,
}

/// One variable with its initial value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct VariableConfig {
    pub name: String,
    pub value: String,
}

/// One automation window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowConfig {
    pub name: String,

    /// `ondemand`, `keepalive` or `lazy`.
    pub mode: WindowMode,

    /// Command line; the first word is the program.
    pub command: String,

    /// Working directory. `~` and paths relative to the config file work.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Exact window title used to recognize the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Exact application name used to recognize the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Exact window class used to recognize the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// Display used when started outside an assignment (keepalive).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// One explicit command.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandConfig {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Command line with `%argname` placeholders.
    pub command: String,

    /// Whether the command opens windows. Such commands take over their
    /// display until they exit.
    pub windows: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    pub arguments: Vec<ArgumentConfig>,
}

/// One command argument.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ArgumentConfig {
    pub name: String,

    /// `string` or `enum`.
    #[serde(rename = "type")]
    pub kind: ArgumentKind,

    /// Allowed values of an enum argument.
    pub options: Vec<String>,

    /// Hint shown to clients for string arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Filter directive such as `info` or `rpcd_lib=debug`. `RPCD_LOG` and
    /// `-v` take precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RpcdConfig::default();
        assert!(config.displays.is_empty());
        assert_eq!(config.window_manager.binary, "ratpoison");
        assert_eq!(config.window_manager.timeout(), Duration::from_secs(2));
        assert_eq!(config.window_manager.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_socket_path_resolution() {
        let base = Path::new("/etc/rpcd");
        let mut control = ControlConfig::default();
        assert_eq!(control.socket_path(base), default_socket_path());

        control.socket = Some("run/rpcd.sock".to_string());
        assert_eq!(control.socket_path(base), PathBuf::from("/etc/rpcd/run/rpcd.sock"));
        assert_eq!(control.fifo_path(base), None);

        control.fifo = Some("/run/rpcd.fifo".to_string());
        assert_eq!(control.fifo_path(base), Some(PathBuf::from("/run/rpcd.fifo")));
    }

    #[test]
    fn test_window_deserializes_camel_case() {
        let window: WindowConfig = serde_json::from_str(
            r#"{"name": "clock", "mode": "keepalive", "command": "xclock", "className": "XClock", "appName": "xclock"}"#,
        )
        .unwrap();
        assert_eq!(window.mode, WindowMode::Keepalive);
        assert_eq!(window.class_name.as_deref(), Some("XClock"));
        assert_eq!(window.app_name.as_deref(), Some("xclock"));
    }

    #[test]
    fn test_repatriated_mode_is_not_configurable() {
        let result = serde_json::from_str::<WindowConfig>(r#"{"name": "x", "mode": "repatriated"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_argument_type_key() {
        let arg: ArgumentConfig =
            serde_json::from_str(r#"{"name": "quality", "type": "enum", "options": ["Low", "High"]}"#).unwrap();
        assert_eq!(arg.kind, ArgumentKind::Enum);
        assert_eq!(arg.options.len(), 2);
    }
}
