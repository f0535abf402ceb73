//! Logging bootstrap for binaries and tests embedding the engine.

use tracing_subscriber::EnvFilter;

/// Installs a compact fmt subscriber filtered by `RUST_LOG`, falling back
/// to `default_directive` (e.g. `"driftguard_engine=debug"`).
///
/// Fails if the directive does not parse or a global subscriber is already
/// installed.
pub fn try_init_logging(
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
}

/// Like [`try_init_logging`], but ignores failures so repeated calls are
/// harmless.
pub fn init_logging(default_directive: &str) {
    let _ = try_init_logging(default_directive);
}
