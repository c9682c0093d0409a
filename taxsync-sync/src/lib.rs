//! TAXSYNC Sync - Refresh Cycle
//!
//! Ties the storage, repair and mirror crates together. A refresh resolves
//! the cache generation for a (tenant, source server) pair, asks the
//! freshness oracle whether it is stale, and if so repairs the incoming
//! batch, replaces the stored generation wholesale and mirrors the result.

pub mod loader;
pub mod service;
pub mod telemetry;

pub use loader::{DimensionLoader, StaticDimensionLoader};
pub use service::{ReconciliationService, RefreshReport, SyncTarget};
pub use telemetry::{init_tracing, DEFAULT_LOG_FILTER};
