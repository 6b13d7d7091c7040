//! Shared tracing/logging setup for portal binaries.

use tracing_subscriber::EnvFilter;

/// Initialize the process-wide subscriber: JSON lines to stdout, filtered
/// via `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_target(false)
        .try_init();

    tracing::debug!("tracing initialized");
}
