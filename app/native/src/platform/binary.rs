//! Executable lookup.
//!
//! Used to resolve the window manager client once at startup and by
//! `rpcd check` to report managed commands whose program cannot be found.

use std::env;
use std::path::{Path, PathBuf};

/// Extra colon-separated directories searched before `PATH`.
pub const EXTRA_PATHS_VAR: &str = "RPCD_EXTRA_PATHS";

/// Resolves the absolute path of an executable.
///
/// Absolute paths are checked as-is. Bare names are searched in
/// `RPCD_EXTRA_PATHS`, then `PATH`, then a few common install locations.
///
/// # Errors
///
/// Returns a description of the failure when nothing executable is found.
pub fn resolve_binary(binary: &str) -> Result<PathBuf, String> {
    if binary.is_empty() {
        return Err("Binary name cannot be empty".to_string());
    }

    let candidate = Path::new(binary);
    if candidate.is_absolute() || binary.contains('/') {
        return if is_executable(candidate) {
            Ok(candidate.to_path_buf())
        } else {
            Err(format!("Binary at {} is not executable", candidate.display()))
        };
    }

    let mut search_paths = Vec::new();

    if let Ok(extra) = env::var(EXTRA_PATHS_VAR) {
        search_paths.extend(extra.split(':').map(PathBuf::from));
    }

    if let Some(path_var) = env::var_os("PATH") {
        search_paths.extend(env::split_paths(&path_var));
    }

    search_paths.extend([PathBuf::from("/usr/local/bin"), PathBuf::from("/usr/bin"), PathBuf::from("/bin")]);

    if let Some(home) = dirs::home_dir() {
        search_paths.push(home.join(".local/bin"));
    }

    search_paths
        .into_iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(binary))
        .find(|path| is_executable(path))
        .ok_or_else(|| format!("Unable to locate executable '{binary}' in known search paths"))
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}
