//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments.

use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use super::daemon;
use crate::config::{self, RpcdConfig};
use crate::controller::Controller;
use crate::error::RpcdError;
use crate::logging;
use crate::platform::OsLauncher;
use crate::platform::binary::resolve_binary;
use crate::wm::RatpoisonClient;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// rpcd - keeps ratpoison frames filled according to an automation script.
#[derive(Parser, Debug)]
#[command(name = "rpcd")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file.
    ///
    /// Defaults to the first of `$XDG_CONFIG_HOME/rpcd/config.jsonc`,
    /// `~/.config/rpcd/config.jsonc` and `~/.rpcd.jsonc` that exists.
    #[arg(long, short, global = true, env = "RPCD_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (`-v` debug, `-vv` trace).
    ///
    /// `RPCD_LOG` takes precedence when set.
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Run the daemon (the default).
    ///
    /// Loads the configuration, starts keepalive windows, opens the control
    /// socket and keeps the displays in sync with the automation script until
    /// SIGINT, SIGTERM or SIGQUIT.
    Run,

    /// Validate the configuration.
    ///
    /// Loads the configuration and compiles the automation script without
    /// touching the window manager, then prints a summary. Programs that
    /// cannot be found on `PATH` are reported as warnings.
    Check,

    /// Output the configuration JSON Schema.
    ///
    /// Can be redirected to a file for use with editors that support JSON
    /// Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Usage:
    ///   eval "$(rpcd completions --shell zsh)"
    ///   rpcd completions --shell bash > ~/.local/share/bash-completion/completions/rpcd
    ///   rpcd completions --shell fish > ~/.config/fish/completions/rpcd.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), RpcdError> {
        match self.command.clone().unwrap_or(Commands::Run) {
            Commands::Run => daemon::run(self.config.as_deref(), self.verbose),
            Commands::Check => self.execute_check(),
            Commands::Schema => {
                println!("{}", config::schema_json()?);
                Ok(())
            }
            Commands::Completions { shell } => {
                Self::print_completions(shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "rpcd", &mut io::stdout());
    }

    /// Execute the check command.
    fn execute_check(&self) -> Result<(), RpcdError> {
        let (config, path) = config::load_config(self.config.as_deref())?;
        logging::init(self.verbose, config.logging.level.as_deref());

        let wm = RatpoisonClient::new(&config.window_manager.binary, config.window_manager.timeout());
        let controller =
            config::build_controller(&config, &config::base_dir(&path), Box::new(wm), Box::new(OsLauncher::new()))?;

        println!("{}: ok", path.display());
        print!("{}", summary(&config, &controller));

        for warning in missing_programs(&config, &controller) {
            eprintln!("warning: {warning}");
        }
        Ok(())
    }
}

/// Human-readable overview of a loaded configuration.
fn summary(config: &RpcdConfig, controller: &Controller) -> String {
    let displays = controller.displays();
    let mut out = String::new();

    for display in displays.displays() {
        let layouts: Vec<&str> = displays.layouts_for(display.id).map(|(_, l)| l.name.as_str()).collect();
        let default = display.default_layout.and_then(|id| displays.layout(id)).map_or("-", |l| l.name.as_str());
        let _ = writeln!(
            out,
            "display {} ({}): layouts [{}], default {default}",
            display.name,
            display.identifier,
            layouts.join(", "),
        );
    }

    let entries = controller.supervisor().entries();
    let commands = entries.iter().filter(|e| e.kind().is_command()).count();
    let _ = writeln!(out, "variables: {}", controller.variables().len());
    let _ = writeln!(out, "windows: {}", entries.len() - commands);
    let _ = writeln!(out, "commands: {commands}");
    let _ = writeln!(
        out,
        "automation: {} lines, {} operations",
        config.automation.len(),
        controller.script().len()
    );
    out
}

/// Programs named by the configuration that cannot be resolved right now.
fn missing_programs(config: &RpcdConfig, controller: &Controller) -> Vec<String> {
    let mut missing = Vec::new();

    if let Err(err) = resolve_binary(&config.window_manager.binary) {
        missing.push(format!("window manager: {err}"));
    }

    for entry in controller.supervisor().entries() {
        let Some(program) = entry.def.command.split_whitespace().next() else { continue };
        // Placeholders are filled at start time.
        if program.contains('%') {
            continue;
        }
        if let Err(err) = resolve_binary(program) {
            missing.push(format!("{}: {err}", entry.name()));
        }
    }
    missing
}
