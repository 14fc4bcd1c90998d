//! CLI module for rpcd.
//!
//! The binary is the daemon itself. Without a subcommand it loads the
//! configuration and runs until a shutdown signal arrives; the remaining
//! subcommands help write and validate configuration files.

mod commands;
mod daemon;

use clap::Parser;
pub use commands::Cli;

use crate::error::RpcdError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), RpcdError> {
    let cli = Cli::parse();
    cli.execute()
}
