//! Log output
//!
//! Diagnostics go to stderr through `tracing`; stdout carries only the
//! `Result:` line.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Filter used when nothing else selects one.
pub const DEFAULT_FILTER: &str = "warn";

/// Pick the filter directive: `RUST_LOG`, then `-v` count, then config.
pub fn filter_expr(rust_log: Option<String>, verbosity: u8, configured: Option<&str>) -> String {
    if let Some(expr) = rust_log.filter(|s| !s.trim().is_empty()) {
        return expr;
    }
    match verbosity {
        0 => configured.unwrap_or(DEFAULT_FILTER).to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: u8, configured: Option<&str>) {
    let expr = filter_expr(std::env::var("RUST_LOG").ok(), verbosity, configured);
    let filter = EnvFilter::try_new(&expr).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
