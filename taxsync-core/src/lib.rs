//! TAXSYNC Core - Entity Types
//!
//! Pure data structures for the tax-rate cache synchronization pipeline.
//! All other crates depend on this. This crate contains data types,
//! errors and configuration only - no I/O.

pub mod config;
pub mod entities;
pub mod error;
pub mod geography;
pub mod identity;
pub mod snapshot;

pub use config::{
    optimal_worker_count, ChunkSize, LmdbConfig, MirrorConfig, SyncConfig, DEFAULT_CHUNK_SIZE,
};
pub use entities::{TaxRateCache, TaxRateCacheDocument, TaxRateCacheEntry};
pub use error::{
    Attempt, ConfigError, MirrorError, OperationFailure, RepairError, StorageError, TaxSyncError,
    TaxSyncResult, ValidationError,
};
pub use geography::{
    Country, County, CountyRef, PostalCode, StateProvince, StateProvinceRef, Warehouse,
};
pub use identity::{
    CacheId, EntityIdType, EntryId, RecordNumber, SourceServerId, TenantId, Timestamp,
};
pub use snapshot::DimensionSnapshot;

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ENUMS
// ============================================================================

/// Entity type discriminator used in storage errors and keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    TaxRateCache,
    TaxRateCacheEntry,
    TaxRateCacheDocument,
}

/// Reference dimension targeted by a fixup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Warehouse,
    Country,
    StateProvince,
    County,
    PostalCode,
}

impl Dimension {
    /// All dimensions, in the order a full repair run applies them.
    pub const ALL: [Dimension; 5] = [
        Dimension::Warehouse,
        Dimension::Country,
        Dimension::StateProvince,
        Dimension::County,
        Dimension::PostalCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warehouse => "Warehouse",
            Self::Country => "Country",
            Self::StateProvince => "StateProvince",
            Self::County => "County",
            Self::PostalCode => "PostalCode",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TEXT HELPERS
// ============================================================================

/// True when `value` is empty or whitespace only.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Normalize a code for case-insensitive matching. Blank codes never match.
pub fn normalize_code(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("   \t"));
        assert!(!is_blank(" x "));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  Us "), Some("us".to_string()));
        assert_eq!(normalize_code("  "), None);
    }

    #[test]
    fn test_dimension_display() {
        assert_eq!(Dimension::StateProvince.to_string(), "StateProvince");
        assert_eq!(Dimension::ALL.len(), 5);
        assert_eq!(Dimension::ALL[0], Dimension::Warehouse);
    }
}
