//! Freshness oracle: decides whether a cache generation must be rebuilt.

use crate::EntryStore;
use std::fmt;
use std::sync::Arc;
use taxsync_core::{CacheId, TaxSyncResult};

/// Outcome of comparing a cache against the source system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Nothing has been synced into the cache yet.
    Empty,
    /// Stored and reported counts differ.
    CountMismatch { internal: i64, external: i64 },
    /// Stored and reported counts agree.
    InSync { count: i64 },
    /// The source reported no usable count; nothing to compare against.
    NoExternalCount { internal: i64 },
}

impl RefreshDecision {
    pub fn needs_refresh(&self) -> bool {
        matches!(self, Self::Empty | Self::CountMismatch { .. })
    }
}

impl fmt::Display for RefreshDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::CountMismatch { internal, external } => {
                write!(f, "count mismatch (stored {internal}, source {external})")
            }
            Self::InSync { count } => write!(f, "in sync ({count} entries)"),
            Self::NoExternalCount { internal } => {
                write!(f, "no source count ({internal} stored)")
            }
        }
    }
}

/// Pure comparison behind [`FreshnessOracle::needs_refresh_against`].
///
/// A non-positive external count means the source buffer reported nothing
/// to compare against, which never forces a rebuild.
pub fn count_mismatch(internal: i64, external: i64) -> bool {
    external > 0 && internal != external
}

/// Count-based freshness checks over an [`EntryStore`].
pub struct FreshnessOracle<E: EntryStore + ?Sized> {
    store: Arc<E>,
}

impl<E: EntryStore + ?Sized> Clone for FreshnessOracle<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<E: EntryStore + ?Sized> FreshnessOracle<E> {
    pub fn new(store: Arc<E>) -> Self {
        Self { store }
    }

    /// True when the cache holds no entries.
    ///
    /// Count failures are returned to the caller rather than folded into
    /// a boolean.
    pub async fn needs_refresh(&self, cache_id: CacheId) -> TaxSyncResult<bool> {
        let internal = self.internal_count(cache_id).await?;
        Ok(internal == 0)
    }

    /// True when the source reports a positive count that differs from the
    /// stored count.
    pub async fn needs_refresh_against(
        &self,
        cache_id: CacheId,
        external_count: i64,
    ) -> TaxSyncResult<bool> {
        let internal = self.internal_count(cache_id).await?;
        let stale = count_mismatch(internal, external_count);
        tracing::debug!(
            cache_id = %cache_id,
            internal,
            external = external_count,
            stale,
            "Compared cache count against source"
        );
        Ok(stale)
    }

    /// Full decision combining both checks.
    pub async fn decide(
        &self,
        cache_id: CacheId,
        external_count: Option<i64>,
    ) -> TaxSyncResult<RefreshDecision> {
        let internal = self.internal_count(cache_id).await?;

        let decision = if internal == 0 {
            RefreshDecision::Empty
        } else {
            match external_count {
                Some(external) if external > 0 => {
                    if count_mismatch(internal, external) {
                        RefreshDecision::CountMismatch { internal, external }
                    } else {
                        RefreshDecision::InSync { count: internal }
                    }
                }
                _ => RefreshDecision::NoExternalCount { internal },
            }
        };

        tracing::info!(
            cache_id = %cache_id,
            decision = %decision,
            refresh = decision.needs_refresh(),
            "Freshness decision"
        );
        Ok(decision)
    }

    async fn internal_count(&self, cache_id: CacheId) -> TaxSyncResult<i64> {
        self.store.entry_count(cache_id).await.map_err(|e| {
            tracing::error!(cache_id = %cache_id, error = %e, "Failed to count cache entries");
            e
        })
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A positive external count forces a refresh exactly when counts differ.
        #[test]
        fn prop_positive_external_count_is_strict_inequality(
            internal in 0i64..10_000,
            external in 1i64..10_000,
        ) {
            prop_assert_eq!(count_mismatch(internal, external), internal != external);
        }

        /// Equal counts are always fresh.
        #[test]
        fn prop_equal_counts_are_fresh(n in any::<i64>()) {
            prop_assert!(!count_mismatch(n, n));
        }

        /// Non-positive external counts never force a refresh.
        #[test]
        fn prop_non_positive_external_never_refreshes(
            internal in any::<i64>(),
            external in i64::MIN..=0,
        ) {
            prop_assert!(!count_mismatch(internal, external));
        }
    }
}
