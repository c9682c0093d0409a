//! Configuration types

use crate::{ConfigError, TaxSyncResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Page size used when the caller supplies zero or `-1`.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

pub const DEFAULT_MIRROR_HOSTNAME: &str = "http://localhost:5984";
pub const DEFAULT_MIRROR_DATABASE: &str = "tax_rate_cache";
pub const DEFAULT_MIRROR_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LMDB_PATH: &str = "./data/taxsync";
pub const DEFAULT_LMDB_MAX_SIZE_MB: usize = 1024;

// ============================================================================
// CHUNK SIZE
// ============================================================================

/// Effective page size for mirroring and raw-listing export.
///
/// Raw values are normalized once, at construction:
/// - `0` and `-1` fall back to [`DEFAULT_CHUNK_SIZE`]
/// - any other negative value is replaced by its absolute value
/// - positive values are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSize(NonZeroUsize);

impl ChunkSize {
    pub fn new(raw: i64) -> Self {
        let size = match raw {
            0 | -1 => DEFAULT_CHUNK_SIZE,
            n => usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX),
        };
        // size is never zero here: 0 maps to the default above
        Self(NonZeroUsize::new(size).unwrap_or(NonZeroUsize::MIN))
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// MIRROR CONFIG
// ============================================================================

/// Document-store endpoint and credentials.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Base URL, e.g. `http://couch.internal:5984`.
    pub hostname: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub timeout_ms: u64,
}

impl MirrorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_MIRROR_HOSTNAME.to_string(),
            database: DEFAULT_MIRROR_DATABASE.to_string(),
            username: String::new(),
            password: String::new(),
            timeout_ms: DEFAULT_MIRROR_TIMEOUT_MS,
        }
    }
}

impl fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("hostname", &self.hostname)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// On-disk entry store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmdbConfig {
    pub path: PathBuf,
    pub max_size_mb: usize,
}

impl Default for LmdbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LMDB_PATH),
            max_size_mb: DEFAULT_LMDB_MAX_SIZE_MB,
        }
    }
}

// ============================================================================
// SYNC CONFIG
// ============================================================================

/// Master configuration for a synchronization job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Raw chunk size as supplied; see [`ChunkSize`] for normalization.
    pub chunk_size: i64,
    /// Repair worker count. `None` uses the available core count.
    pub worker_count: Option<usize>,
    pub mirror: MirrorConfig,
    pub lmdb: LmdbConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE as i64,
            worker_count: None,
            mirror: MirrorConfig::default(),
            lmdb: LmdbConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Create SyncConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `TAXSYNC_CHUNK_SIZE`: mirror/export page size (default: 1000)
    /// - `TAXSYNC_WORKERS`: repair worker count (default: available cores)
    /// - `TAXSYNC_MIRROR_HOSTNAME`: document store base URL
    /// - `TAXSYNC_MIRROR_DATABASE`: document store database name
    /// - `TAXSYNC_MIRROR_USERNAME` / `TAXSYNC_MIRROR_PASSWORD`: basic-auth credentials
    /// - `TAXSYNC_MIRROR_TIMEOUT_MS`: per-request timeout (default: 30000)
    /// - `TAXSYNC_LMDB_PATH`: entry store directory
    /// - `TAXSYNC_LMDB_MAX_SIZE_MB`: entry store map size (default: 1024)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable values fall
    /// back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            chunk_size: parse_value(&lookup, "TAXSYNC_CHUNK_SIZE")
                .unwrap_or(defaults.chunk_size),
            worker_count: parse_value(&lookup, "TAXSYNC_WORKERS"),
            mirror: MirrorConfig {
                hostname: lookup("TAXSYNC_MIRROR_HOSTNAME").unwrap_or(defaults.mirror.hostname),
                database: lookup("TAXSYNC_MIRROR_DATABASE").unwrap_or(defaults.mirror.database),
                username: lookup("TAXSYNC_MIRROR_USERNAME").unwrap_or_default(),
                password: lookup("TAXSYNC_MIRROR_PASSWORD").unwrap_or_default(),
                timeout_ms: parse_value(&lookup, "TAXSYNC_MIRROR_TIMEOUT_MS")
                    .unwrap_or(defaults.mirror.timeout_ms),
            },
            lmdb: LmdbConfig {
                path: lookup("TAXSYNC_LMDB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.lmdb.path),
                max_size_mb: parse_value(&lookup, "TAXSYNC_LMDB_MAX_SIZE_MB")
                    .unwrap_or(defaults.lmdb.max_size_mb),
            },
        }
    }

    pub fn chunk_size(&self) -> ChunkSize {
        ChunkSize::new(self.chunk_size)
    }

    /// Worker count for repair passes.
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count
            .filter(|count| *count > 0)
            .unwrap_or_else(optimal_worker_count)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - mirror hostname is an http(s) URL
    /// - mirror database name is non-empty and contains no `/`
    /// - timeout and LMDB map size are positive
    /// - an explicit worker count is positive
    pub fn validate(&self) -> TaxSyncResult<()> {
        let hostname = self.mirror.hostname.trim();
        if hostname.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "mirror.hostname".to_string(),
            }
            .into());
        }
        if !(hostname.starts_with("http://") || hostname.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "mirror.hostname".to_string(),
                value: hostname.to_string(),
                reason: "must start with http:// or https://".to_string(),
            }
            .into());
        }

        let database = self.mirror.database.trim();
        if database.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "mirror.database".to_string(),
            }
            .into());
        }
        if database.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "mirror.database".to_string(),
                value: database.to_string(),
                reason: "must not contain '/'".to_string(),
            }
            .into());
        }

        if self.mirror.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "mirror.timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }

        if self.lmdb.max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lmdb.max_size_mb".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }

        if self.worker_count == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "worker_count".to_string(),
                value: "0".to_string(),
                reason: "must be positive when set".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Number of cores available to this process, or 1 if unknown.
/// Look up `key` and parse its trimmed value, if any.
fn parse_value<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| value.trim().parse().ok())
}

pub fn optimal_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
