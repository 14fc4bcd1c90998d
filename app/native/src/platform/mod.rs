//! Linux platform helpers for rpcd.
//!
//! - [`binary`] - executable lookup
//! - [`path`] - tilde expansion and runtime directories
//! - [`process`] - process groups, signals, reaping and parent lookup

pub mod binary;
pub mod path;
pub mod process;

pub use process::{LaunchSpec, OsLauncher, ProcessLauncher, Signal};
