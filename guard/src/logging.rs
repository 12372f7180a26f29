//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Install a JSON subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"vc_guard=debug"`).
///
/// Fails instead of panicking when a global subscriber is already set.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
