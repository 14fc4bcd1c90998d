//! Path helpers.
//!
//! Configuration values such as the control socket, the control FIFO and the
//! working directory of a managed entry may use `~` and may be relative to the
//! directory holding the configuration file.

use std::path::{Path, PathBuf};

/// Directory name used below the runtime and cache directories.
const APP_DIR_NAME: &str = "rpcd";

/// Socket filename inside the runtime directory.
const SOCKET_FILENAME: &str = "control.sock";

/// Expands a leading `~` to the user's home directory.
///
/// Empty input (after trimming) yields an empty path. Relative paths are
/// returned untouched; use [`expand_and_resolve`] to anchor them.
#[must_use]
pub fn expand(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return PathBuf::new();
    }

    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

/// Expands `~` and anchors relative paths at `base_dir`.
///
/// # Arguments
///
/// * `path` - The configured path
/// * `base_dir` - Directory relative paths are resolved against, usually the
///   directory of the configuration file
#[must_use]
pub fn expand_and_resolve(path: &str, base_dir: &Path) -> PathBuf {
    let expanded = expand(path);

    if expanded.as_os_str().is_empty() || expanded.is_absolute() {
        return expanded;
    }

    base_dir.join(expanded)
}

/// Returns the directory for sockets and other per-session files.
///
/// `$XDG_RUNTIME_DIR/rpcd` when available, then the user cache directory,
/// then `/tmp/rpcd`.
#[must_use]
pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .map_or_else(|| PathBuf::from(format!("/tmp/{APP_DIR_NAME}")), |dir| dir.join(APP_DIR_NAME))
}

/// Default location of the control socket when the configuration names none.
#[must_use]
pub fn default_socket_path() -> PathBuf { runtime_dir().join(SOCKET_FILENAME) }
