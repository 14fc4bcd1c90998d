//! Error types for rpcd.
//!
//! Every layer carries its own `thiserror` enum (`ConfigError`, `CompileError`,
//! `SupervisorError`, `WmError`, ...). `RpcdError` is the unified type the CLI
//! entry point returns and prints before exiting.

use thiserror::Error;

use crate::actor::ActorError;
use crate::config::ConfigError;
use crate::controller::ControllerError;

/// Errors that can occur during application execution.
#[derive(Debug, Error)]
pub enum RpcdError {
    /// Invalid command-line arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Configuration could not be loaded or compiled.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Controller operation failed.
    #[error("Controller error: {0}")]
    Controller(#[from] ControllerError),
    /// Communication with the controller task failed.
    #[error("Actor error: {0}")]
    Actor(#[from] ActorError),
    /// Control channel error.
    #[error("Control channel error: {0}")]
    ControlError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for RpcdError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for RpcdError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<String> for RpcdError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for RpcdError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_display() {
        let err = RpcdError::InvalidArguments("unknown display 'side'".to_string());
        assert_eq!(err.to_string(), "unknown display 'side'");
    }

    #[test]
    fn test_control_error_display() {
        let err = RpcdError::ControlError("socket already bound".to_string());
        assert!(err.to_string().starts_with("Control channel error:"));
        assert!(err.to_string().contains("socket already bound"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "fifo missing");
        let err: RpcdError = io_err.into();
        assert!(matches!(err, RpcdError::IoError(_)));
        assert!(err.to_string().contains("fifo missing"));
    }

    #[test]
    fn test_from_config_error() {
        let err: RpcdError = ConfigError::NotFound("~/.config/rpcd/config.jsonc".to_string()).into();
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_from_string_and_str() {
        let owned: RpcdError = String::from("owned message").into();
        let borrowed: RpcdError = "borrowed message".into();
        assert_eq!(owned.to_string(), "owned message");
        assert_eq!(borrowed.to_string(), "borrowed message");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: RpcdError = json_err.into();
        assert!(matches!(err, RpcdError::CommandError(_)));
    }
}
