//! rpcd - ratpoison control daemon.
//!
//! Without a subcommand the binary runs the daemon; `rpcd check`, `rpcd
//! schema` and `rpcd completions` help with configuration files.

fn main() {
    if let Err(err) = rpcd_lib::cli::run() {
        eprintln!("rpcd: {err}");
        std::process::exit(1);
    }
}
