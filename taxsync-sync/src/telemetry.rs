//! Tracing subscriber setup for jobs that embed the sync service.
//!
//! Library crates only emit events; installing a subscriber is left to the
//! process that runs the refresh jobs.

use taxsync_core::{ConfigError, TaxSyncResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str =
    "taxsync_sync=info,taxsync_repair=info,taxsync_storage=info,taxsync_mirror=info,warn";

/// Install a JSON-formatting subscriber filtered by `RUST_LOG`, falling back
/// to `default_filter`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> TaxSyncResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| ConfigError::InvalidValue {
            field: "tracing".to_string(),
            value: default_filter.to_string(),
            reason: format!("Failed to init subscriber: {}", e),
        })?;

    tracing::info!(filter = default_filter, "Tracing initialized");
    Ok(())
}
