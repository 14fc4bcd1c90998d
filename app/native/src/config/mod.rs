//! Configuration loading.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.
//! Loading happens once at startup; [`build_controller`] turns the parsed
//! file into a ready-to-start [`Controller`](crate::controller::Controller).

mod build;
mod types;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

pub use build::build_controller;
use thiserror::Error;
pub use types::{
    ArgumentConfig, CommandConfig, ControlConfig, DisplayConfig, FrameConfig, LayoutConfig,
    LoggingConfig, RpcdConfig, VariableConfig, WindowConfig, WindowManagerConfig,
};

use crate::automation::CompileError;
use crate::supervisor::SupervisorError;
use crate::variables::VariableError;

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Configuration file names in the home directory.
const HOME_CONFIG_FILE_NAMES: &[&str] = &[".rpcd.jsonc", ".rpcd.json"];

/// Directory name below the configuration directories.
const APP_DIR_NAME: &str = "rpcd";

/// Errors raised while loading and validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file in any searched location.
    #[error("no configuration file found (searched {0})")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file parsed but describes something impossible.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Variable(#[from] VariableError),

    #[error(transparent)]
    Entry(#[from] SupervisorError),

    /// An automation line failed to compile. `line` is 1-based.
    #[error("automation line {line} `{text}`: {source}")]
    Compile {
        line: usize,
        text: String,
        #[source]
        source: CompileError,
    },
}

fn push_config_files(dir: &Path, paths: &mut Vec<PathBuf>) {
    for filename in CONFIG_FILE_NAMES {
        let path = dir.join(filename);
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
}

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/rpcd/config.jsonc` or `config.json`, when set
/// 2. `~/.config/rpcd/config.jsonc` or `config.json`
/// 3. the platform configuration directory, when different
/// 4. `~/.rpcd.jsonc` or `~/.rpcd.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        push_config_files(&PathBuf::from(xdg_config).join(APP_DIR_NAME), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        push_config_files(&home.join(".config").join(APP_DIR_NAME), &mut paths);
    }

    if let Some(config_dir) = dirs::config_dir() {
        push_config_files(&config_dir.join(APP_DIR_NAME), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        for filename in HOME_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Parses configuration text, stripping comments first.
///
/// # Errors
///
/// Returns the JSON error for malformed input.
pub fn parse_config(text: &str) -> Result<RpcdConfig, serde_json::Error> {
    let mut stripped = String::with_capacity(text.len());
    json_comments::StripComments::new(text.as_bytes())
        .read_to_string(&mut stripped)
        .map_err(serde_json::Error::io)?;
    serde_json::from_str(&stripped)
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
pub fn load_config_from_path(path: &Path) -> Result<(RpcdConfig, PathBuf), ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let config = parse_config(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok((config, path.to_path_buf()))
}

/// Loads the configuration from `custom`, or the first existing default path.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] when nothing exists, or the error from
/// [`load_config_from_path`].
pub fn load_config(custom: Option<&Path>) -> Result<(RpcdConfig, PathBuf), ConfigError> {
    if let Some(path) = custom {
        return load_config_from_path(path);
    }

    let paths = config_paths();
    if let Some(path) = paths.iter().find(|p| p.is_file()) {
        return load_config_from_path(path);
    }

    let searched = paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ");
    Err(ConfigError::NotFound(searched))
}

/// Directory relative paths in `path` are resolved against.
#[must_use]
pub fn base_dir(path: &Path) -> PathBuf {
    path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// JSON Schema of the configuration file, pretty-printed.
///
/// # Errors
///
/// Returns the serialization error, which does not happen in practice.
pub fn schema_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schemars::schema_for!(RpcdConfig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jsonc() {
        let config = parse_config(
            r#"{
                // main screen
                "displays": [{ "name": "main", "display": ":0" }],
                /* script */
                "automation": ["layout main/full"]
            }"#,
        )
        .unwrap();
        assert_eq!(config.displays[0].display, ":0");
        assert_eq!(config.automation, vec!["layout main/full".to_string()]);
    }

    #[test]
    fn test_parse_error() {
        assert!(parse_config("{ \"displays\": 3 }").is_err());
    }

    #[test]
    fn test_config_paths_are_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty());
        assert!(paths.iter().all(|p| p.to_string_lossy().contains("rpcd")));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        fs::write(&path, "{ \"variables\": [{ \"name\": \"mode\" }] }").unwrap();

        let (config, loaded) = load_config(Some(&path)).unwrap();
        assert_eq!(loaded, path);
        assert_eq!(config.variables[0].value, "");
        assert_eq!(base_dir(&loaded), dir.path());
    }

    #[test]
    fn test_load_reports_path_on_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jsonc");
        assert!(matches!(load_config(Some(&missing)), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{").unwrap();
        let err = load_config(Some(&broken)).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_schema_mentions_sections() {
        let schema = schema_json().unwrap();
        assert!(schema.contains("windowManager"));
        assert!(schema.contains("automation"));
    }
}
