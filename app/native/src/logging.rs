//! Logging setup.
//!
//! Structured logging through `tracing`, written to stderr by a
//! `tracing-subscriber` fmt layer. The filter comes from `RPCD_LOG` when set,
//! otherwise from the `-v` count on the command line, otherwise from the
//! `logging.level` key of the configuration file.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "RPCD_LOG";

/// Level used when neither the command line nor the configuration names one.
const DEFAULT_LEVEL: &str = "info";

/// Picks the filter directive from the verbosity flag and the configured level.
#[must_use]
pub fn filter_directive(verbosity: u8, configured: Option<&str>) -> String {
    let level = match verbosity {
        0 => configured.filter(|level| !level.trim().is_empty()).unwrap_or(DEFAULT_LEVEL),
        1 => "debug",
        _ => "trace",
    };
    level.trim().to_lowercase()
}

/// Installs the global subscriber.
///
/// Calling this twice is harmless; the second call is ignored so that tests
/// and the binary can both initialize logging.
pub fn init(verbosity: u8, configured: Option<&str>) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity, configured)));

    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    if Registry::default().with(filter).with(layer).try_init().is_err() {
        tracing::trace!("logging already initialized");
    }
}
