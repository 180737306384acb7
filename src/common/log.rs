//! Logging setup for both binaries: a single `tracing-subscriber`
//! registry, level controlled by `RUST_LOG` (default `info`).

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Safe to call at most once per process;
/// the daemon calls it at startup, the CLI only under `--debug`.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
