//! Logging setup
//!
//! `RUST_LOG` wins; otherwise the level follows the CLI verbosity.
//! Logs go to stderr so stdout carries only results.

use crate::cli::Verbosity;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; later calls are no-ops
pub fn init(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
