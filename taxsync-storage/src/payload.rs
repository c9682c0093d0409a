//! Bounded-range reads over an entry store.

use crate::EntryStore;
use std::sync::Arc;
use taxsync_core::{
    CacheId, RecordNumber, TaxRateCacheEntry, TaxSyncResult, ValidationError,
};

/// Batch reader for consumers that pull a cache in pages.
pub struct PayloadAccessor<E: EntryStore + ?Sized> {
    store: Arc<E>,
}

impl<E: EntryStore + ?Sized> Clone for PayloadAccessor<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<E: EntryStore + ?Sized> PayloadAccessor<E> {
    pub fn new(store: Arc<E>) -> Self {
        Self { store }
    }

    /// Up to `count` entries ordered by record number, starting at record
    /// number `start` (inclusive). When no entry sits exactly at `start`, the
    /// page begins at the next occupied position.
    ///
    /// Fails with [`ValidationError::OutOfRange`] before touching the store
    /// when `start < 0` or `count < 1`.
    pub async fn get_payload(
        &self,
        cache_id: CacheId,
        start: RecordNumber,
        count: i64,
    ) -> TaxSyncResult<Vec<TaxRateCacheEntry>> {
        validate_range(start, count)?;
        let limit = usize::try_from(count).unwrap_or(usize::MAX);
        let page = self.store.entry_range(cache_id, start, limit).await?;

        tracing::debug!(
            cache_id = %cache_id,
            start,
            requested = count,
            returned = page.len(),
            "Served payload page"
        );
        Ok(page)
    }

    /// Point lookup by ordinal position. An unoccupied position is `None`.
    pub async fn get_entry_by_record_number(
        &self,
        cache_id: CacheId,
        record_number: RecordNumber,
    ) -> TaxSyncResult<Option<TaxRateCacheEntry>> {
        self.store
            .entry_get_by_record_number(cache_id, record_number)
            .await
    }
}

fn validate_range(start: RecordNumber, count: i64) -> Result<(), ValidationError> {
    if start < 0 {
        return Err(ValidationError::OutOfRange {
            field: "starting_index".to_string(),
            value: start,
            reason: "must be >= 0".to_string(),
        });
    }
    if count < 1 {
        return Err(ValidationError::OutOfRange {
            field: "count".to_string(),
            value: count,
            reason: "must be >= 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryEntryStore;
    use taxsync_core::{EntityIdType, TaxSyncError};
    use taxsync_test_utils::fixtures;

    async fn accessor_with(
        cache_id: CacheId,
        numbers: &[RecordNumber],
    ) -> PayloadAccessor<InMemoryEntryStore> {
        let store = Arc::new(InMemoryEntryStore::new());
        for n in numbers {
            store
                .entry_create(&fixtures::complete_entry(cache_id, *n))
                .await
                .unwrap();
        }
        PayloadAccessor::new(store)
    }

    #[tokio::test]
    async fn test_negative_start_is_range_error() {
        let cache_id = CacheId::now_v7();
        let accessor = accessor_with(cache_id, &[0, 1, 2]).await;

        let result = accessor.get_payload(cache_id, -1, 5).await;
        assert!(matches!(
            result,
            Err(TaxSyncError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[tokio::test]
    async fn test_zero_count_is_range_error() {
        let cache_id = CacheId::now_v7();
        let accessor = accessor_with(cache_id, &[0, 1, 2]).await;

        let err = accessor.get_payload(cache_id, 0, 0).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_first_page_of_five() {
        let cache_id = CacheId::now_v7();
        let accessor = accessor_with(cache_id, &[0, 1, 2, 3, 4]).await;

        let page = accessor.get_payload(cache_id, 0, 3).await.unwrap();
        let numbers: Vec<_> = page.iter().map(|e| e.record_number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_page_starts_at_lowest_available() {
        let cache_id = CacheId::now_v7();
        let accessor = accessor_with(cache_id, &[3, 5, 8, 9]).await;

        let page = accessor.get_payload(cache_id, 0, 3).await.unwrap();
        let numbers: Vec<_> = page.iter().map(|e| e.record_number).collect();
        assert_eq!(numbers, vec![3, 5, 8]);

        let tail = accessor.get_payload(cache_id, 6, 100).await.unwrap();
        assert_eq!(tail.len(), 2);
    }

    #[tokio::test]
    async fn test_get_entry_by_record_number() {
        let cache_id = CacheId::now_v7();
        let accessor = accessor_with(cache_id, &[0, 2]).await;

        let found = accessor
            .get_entry_by_record_number(cache_id, 2)
            .await
            .unwrap();
        assert_eq!(found.map(|e| e.record_number), Some(2));

        let missing = accessor
            .get_entry_by_record_number(cache_id, 1)
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
