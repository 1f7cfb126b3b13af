//! Logging configuration for sitegate.
//!
//! Site actions log at `info`, refused gate actions at `warn`, and storage
//! round-trips and change events at `debug`. Logs go to stderr so that
//! `--json` output on stdout stays machine readable.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Schema migrations are routine on every open; only `-v` shows them.
const MIGRATIONS_TARGET: &str = "sitegate::storage::migrations";

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Site actions and warnings.
    #[default]
    Normal,
    /// Storage round-trips, change events and migrations.
    Verbose,
    /// Everything, including each published event and list filter pass.
    Trace,
}

impl Verbosity {
    /// Map the CLI's `-q` and repeated `-v` flags to a level. `-q` wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Filter directives used when `RUST_LOG` is not set.
    #[must_use]
    pub fn directives(self) -> String {
        match self {
            Self::Quiet => "sitegate=error".to_string(),
            Self::Normal => format!("sitegate=info,{MIGRATIONS_TARGET}=warn"),
            Self::Verbose => "sitegate=debug".to_string(),
            Self::Trace => "sitegate=trace".to_string(),
        }
    }
}

/// Initialize the logging system.
///
/// Call once at startup. `RUST_LOG`, when set, replaces the directives
/// chosen by `verbosity`.
///
/// # Examples
///
/// ```no_run
/// use sitegate::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(false, 1));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false),
    );

    // A second call keeps the first subscriber.
    let _ = subscriber.try_init();
}

/// Route logs through the test harness, warnings only unless `RUST_LOG` is
/// set. Safe to call from every fixture.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sitegate=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
