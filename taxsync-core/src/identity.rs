//! Identity types for TAXSYNC entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Ordinal position of an entry inside its cache generation.
pub type RecordNumber = i64;

/// Common behavior for UUID-backed identifiers.
pub trait EntityIdType: Copy + Eq + std::hash::Hash + fmt::Display {
    /// Wrap an existing UUID.
    fn new(id: Uuid) -> Self;

    /// Generate a new UUIDv7 identifier (timestamp-sortable).
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// The nil identifier.
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            fn new(id: Uuid) -> Self {
                Self(id)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a cache generation (session ledger record).
    CacheId
);
uuid_id!(
    /// Identifier of the tenant that owns a cache.
    TenantId
);
uuid_id!(
    /// Identifier of the source order-management server.
    SourceServerId
);

/// Store-assigned identifier of a cache entry.
///
/// Zero means the entry has not been persisted yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl EntryId {
    /// The id carried by entries that have never been persisted.
    pub const UNSAVED: EntryId = EntryId(0);

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_unsaved(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
