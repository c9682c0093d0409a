//! TAXSYNC Storage - Entry Store and Session Ledger
//!
//! Defines the storage contracts for cache generations and their entries,
//! an in-memory implementation, and an LMDB-backed implementation. The
//! freshness oracle and payload accessor are built on top of the
//! [`EntryStore`] contract only.

pub mod cache_key;
pub mod freshness;
pub mod lmdb_backend;
pub mod payload;

pub use cache_key::CacheScopedKey;
pub use freshness::{FreshnessOracle, RefreshDecision};
pub use lmdb_backend::{LmdbEntryStore, LmdbStoreError};
pub use payload::PayloadAccessor;

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use taxsync_core::{
    CacheId, EntityType, EntryId, RecordNumber, SourceServerId, StorageError, TaxRateCache,
    TaxRateCacheEntry, TaxSyncResult, TenantId,
};

// ============================================================================
// STORAGE TRAITS
// ============================================================================

/// Relational store of cache entries.
///
/// Every mutation is a single bounded operation that either commits or
/// fails; no transaction spans more than one call.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Persist a new entry. Unsaved entries (id 0) get a store-assigned id.
    ///
    /// Fails if the id is already taken or another entry of the same cache
    /// occupies the same record number.
    async fn entry_create(&self, entry: &TaxRateCacheEntry) -> TaxSyncResult<TaxRateCacheEntry>;

    /// Replace a stored entry, matched by id.
    async fn entry_update(&self, entry: &TaxRateCacheEntry) -> TaxSyncResult<TaxRateCacheEntry>;

    /// Remove a stored entry, matched by id. Returns the removed entry.
    async fn entry_delete(&self, entry: &TaxRateCacheEntry) -> TaxSyncResult<TaxRateCacheEntry>;

    /// Get an entry by id.
    async fn entry_get(&self, id: EntryId) -> TaxSyncResult<Option<TaxRateCacheEntry>>;

    /// All entries of a cache, ordered by record number.
    async fn entry_list_by_cache(&self, cache_id: CacheId)
        -> TaxSyncResult<Vec<TaxRateCacheEntry>>;

    /// Number of entries held for a cache.
    async fn entry_count(&self, cache_id: CacheId) -> TaxSyncResult<i64>;

    /// Up to `count` entries with record number >= `start`, ordered by
    /// record number. Arguments are not validated here; see
    /// [`PayloadAccessor`] for the checked form.
    async fn entry_range(
        &self,
        cache_id: CacheId,
        start: RecordNumber,
        count: usize,
    ) -> TaxSyncResult<Vec<TaxRateCacheEntry>>;

    /// Point lookup by ordinal position.
    async fn entry_get_by_record_number(
        &self,
        cache_id: CacheId,
        record_number: RecordNumber,
    ) -> TaxSyncResult<Option<TaxRateCacheEntry>>;

    /// Remove every entry of a cache. Returns the number of rows removed.
    async fn entry_delete_all(&self, cache_id: CacheId) -> TaxSyncResult<i64>;
}

/// Session ledger of cache generations.
///
/// Holds at most one generation per (tenant, source server) pair.
#[async_trait]
pub trait CacheSessionStore: Send + Sync {
    async fn cache_create(&self, cache: &TaxRateCache) -> TaxSyncResult<TaxRateCache>;

    async fn cache_update(&self, cache: &TaxRateCache) -> TaxSyncResult<TaxRateCache>;

    async fn cache_delete(&self, cache: &TaxRateCache) -> TaxSyncResult<TaxRateCache>;

    async fn cache_get(&self, id: CacheId) -> TaxSyncResult<Option<TaxRateCache>>;

    /// Most recently created generation of a tenant, across source servers.
    async fn cache_get_by_tenant(&self, tenant_id: TenantId)
        -> TaxSyncResult<Option<TaxRateCache>>;

    /// All generations fed by a source server, oldest first.
    async fn cache_list_by_source_server(
        &self,
        source_server: SourceServerId,
    ) -> TaxSyncResult<Vec<TaxRateCache>>;

    /// The generation for an exact (tenant, source server) pair.
    async fn cache_get_for(
        &self,
        tenant_id: TenantId,
        source_server: SourceServerId,
    ) -> TaxSyncResult<Option<TaxRateCache>>;
}

// ============================================================================
// IN-MEMORY ENTRY STORE
// ============================================================================

#[derive(Debug, Default)]
struct EntryTable {
    rows: BTreeMap<EntryId, TaxRateCacheEntry>,
    positions: BTreeMap<(CacheId, RecordNumber), EntryId>,
    last_id: i64,
}

impl EntryTable {
    fn next_id(&mut self) -> EntryId {
        self.last_id += 1;
        EntryId(self.last_id)
    }

    fn cache_rows(&self, cache_id: CacheId) -> impl Iterator<Item = &TaxRateCacheEntry> + '_ {
        self.positions
            .range((cache_id, RecordNumber::MIN)..=(cache_id, RecordNumber::MAX))
            .filter_map(|(_, id)| self.rows.get(id))
    }
}

/// In-memory entry store, used in tests and by embedders without LMDB.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEntryStore {
    table: Arc<RwLock<EntryTable>>,
    failure: Arc<RwLock<Option<StorageError>>>,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `error` until cleared with `None`.
    pub fn inject_failure(&self, error: Option<StorageError>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = error;
        }
    }

    /// Clear all stored data.
    pub fn clear(&self) -> TaxSyncResult<()> {
        let mut table = self.write()?;
        table.rows.clear();
        table.positions.clear();
        Ok(())
    }

    /// Total number of entries across all caches.
    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_failure(&self) -> TaxSyncResult<()> {
        let failure = self.failure.read().map_err(|_| StorageError::LockPoisoned)?;
        match failure.as_ref() {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    fn read(&self) -> TaxSyncResult<RwLockReadGuard<'_, EntryTable>> {
        self.check_failure()?;
        Ok(self.table.read().map_err(|_| StorageError::LockPoisoned)?)
    }

    fn write(&self) -> TaxSyncResult<RwLockWriteGuard<'_, EntryTable>> {
        self.check_failure()?;
        Ok(self.table.write().map_err(|_| StorageError::LockPoisoned)?)
    }
}

fn entry_not_found(id: EntryId) -> StorageError {
    StorageError::NotFound {
        entity_type: EntityType::TaxRateCacheEntry,
        id: id.to_string(),
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn entry_create(&self, entry: &TaxRateCacheEntry) -> TaxSyncResult<TaxRateCacheEntry> {
        let mut table = self.write()?;
        let position = (entry.cache_id, entry.record_number);

        if table.positions.contains_key(&position) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::TaxRateCacheEntry,
                reason: format!(
                    "record number {} already taken in cache {}",
                    entry.record_number, entry.cache_id
                ),
            }
            .into());
        }

        let mut stored = entry.clone();
        if stored.entry_id.is_unsaved() {
            stored.entry_id = table.next_id();
        } else if table.rows.contains_key(&stored.entry_id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::TaxRateCacheEntry,
                reason: format!("entry id {} already exists", stored.entry_id),
            }
            .into());
        } else {
            table.last_id = table.last_id.max(stored.entry_id.get());
        }

        table.positions.insert(position, stored.entry_id);
        table.rows.insert(stored.entry_id, stored.clone());
        Ok(stored)
    }

    async fn entry_update(&self, entry: &TaxRateCacheEntry) -> TaxSyncResult<TaxRateCacheEntry> {
        let mut table = self.write()?;
        let existing = table
            .rows
            .get(&entry.entry_id)
            .ok_or_else(|| entry_not_found(entry.entry_id))?;

        let old_position = (existing.cache_id, existing.record_number);
        let new_position = (entry.cache_id, entry.record_number);

        if old_position != new_position {
            if table.positions.contains_key(&new_position) {
                return Err(StorageError::UpdateFailed {
                    entity_type: EntityType::TaxRateCacheEntry,
                    id: entry.entry_id.to_string(),
                    reason: format!(
                        "record number {} already taken in cache {}",
                        entry.record_number, entry.cache_id
                    ),
                }
                .into());
            }
            table.positions.remove(&old_position);
            table.positions.insert(new_position, entry.entry_id);
        }

        table.rows.insert(entry.entry_id, entry.clone());
        Ok(entry.clone())
    }

    async fn entry_delete(&self, entry: &TaxRateCacheEntry) -> TaxSyncResult<TaxRateCacheEntry> {
        let mut table = self.write()?;
        let removed = table
            .rows
            .remove(&entry.entry_id)
            .ok_or_else(|| entry_not_found(entry.entry_id))?;
        table
            .positions
            .remove(&(removed.cache_id, removed.record_number));
        Ok(removed)
    }

    async fn entry_get(&self, id: EntryId) -> TaxSyncResult<Option<TaxRateCacheEntry>> {
        let table = self.read()?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn entry_list_by_cache(
        &self,
        cache_id: CacheId,
    ) -> TaxSyncResult<Vec<TaxRateCacheEntry>> {
        let table = self.read()?;
        Ok(table.cache_rows(cache_id).cloned().collect())
    }

    async fn entry_count(&self, cache_id: CacheId) -> TaxSyncResult<i64> {
        let table = self.read()?;
        Ok(table.cache_rows(cache_id).count() as i64)
    }

    async fn entry_range(
        &self,
        cache_id: CacheId,
        start: RecordNumber,
        count: usize,
    ) -> TaxSyncResult<Vec<TaxRateCacheEntry>> {
        let table = self.read()?;
        Ok(table
            .positions
            .range((cache_id, start)..=(cache_id, RecordNumber::MAX))
            .filter_map(|(_, id)| table.rows.get(id))
            .take(count)
            .cloned()
            .collect())
    }

    async fn entry_get_by_record_number(
        &self,
        cache_id: CacheId,
        record_number: RecordNumber,
    ) -> TaxSyncResult<Option<TaxRateCacheEntry>> {
        let table = self.read()?;
        Ok(table
            .positions
            .get(&(cache_id, record_number))
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    async fn entry_delete_all(&self, cache_id: CacheId) -> TaxSyncResult<i64> {
        let mut table = self.write()?;
        let doomed: Vec<((CacheId, RecordNumber), EntryId)> = table
            .positions
            .range((cache_id, RecordNumber::MIN)..=(cache_id, RecordNumber::MAX))
            .map(|(position, id)| (*position, *id))
            .collect();

        for (position, id) in &doomed {
            table.positions.remove(position);
            table.rows.remove(id);
        }

        Ok(doomed.len() as i64)
    }
}

// ============================================================================
// IN-MEMORY SESSION STORE
// ============================================================================

/// In-memory session ledger.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionStore {
    caches: Arc<RwLock<HashMap<CacheId, TaxRateCache>>>,
    failure: Arc<RwLock<Option<StorageError>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `error` until cleared with `None`.
    pub fn inject_failure(&self, error: Option<StorageError>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = error;
        }
    }

    pub fn len(&self) -> usize {
        self.caches.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_failure(&self) -> TaxSyncResult<()> {
        let failure = self.failure.read().map_err(|_| StorageError::LockPoisoned)?;
        match failure.as_ref() {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    fn read(&self) -> TaxSyncResult<RwLockReadGuard<'_, HashMap<CacheId, TaxRateCache>>> {
        self.check_failure()?;
        Ok(self.caches.read().map_err(|_| StorageError::LockPoisoned)?)
    }

    fn write(&self) -> TaxSyncResult<RwLockWriteGuard<'_, HashMap<CacheId, TaxRateCache>>> {
        self.check_failure()?;
        Ok(self.caches.write().map_err(|_| StorageError::LockPoisoned)?)
    }
}

fn cache_not_found(id: CacheId) -> StorageError {
    StorageError::NotFound {
        entity_type: EntityType::TaxRateCache,
        id: id.to_string(),
    }
}

#[async_trait]
impl CacheSessionStore for InMemorySessionStore {
    async fn cache_create(&self, cache: &TaxRateCache) -> TaxSyncResult<TaxRateCache> {
        let mut caches = self.write()?;
        if caches.contains_key(&cache.cache_id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::TaxRateCache,
                reason: format!("cache {} already exists", cache.cache_id),
            }
            .into());
        }
        if caches
            .values()
            .any(|c| c.tenant_id == cache.tenant_id && c.source_server == cache.source_server)
        {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::TaxRateCache,
                reason: format!(
                    "tenant {} already has a cache for source server {}",
                    cache.tenant_id, cache.source_server
                ),
            }
            .into());
        }
        caches.insert(cache.cache_id, cache.clone());
        Ok(cache.clone())
    }

    async fn cache_update(&self, cache: &TaxRateCache) -> TaxSyncResult<TaxRateCache> {
        let mut caches = self.write()?;
        let existing = caches
            .get_mut(&cache.cache_id)
            .ok_or_else(|| cache_not_found(cache.cache_id))?;
        *existing = cache.clone();
        Ok(cache.clone())
    }

    async fn cache_delete(&self, cache: &TaxRateCache) -> TaxSyncResult<TaxRateCache> {
        let mut caches = self.write()?;
        caches
            .remove(&cache.cache_id)
            .ok_or_else(|| cache_not_found(cache.cache_id).into())
    }

    async fn cache_get(&self, id: CacheId) -> TaxSyncResult<Option<TaxRateCache>> {
        let caches = self.read()?;
        Ok(caches.get(&id).cloned())
    }

    async fn cache_get_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> TaxSyncResult<Option<TaxRateCache>> {
        let caches = self.read()?;
        Ok(caches
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn cache_list_by_source_server(
        &self,
        source_server: SourceServerId,
    ) -> TaxSyncResult<Vec<TaxRateCache>> {
        let caches = self.read()?;
        let mut result: Vec<TaxRateCache> = caches
            .values()
            .filter(|c| c.source_server == source_server)
            .cloned()
            .collect();
        result.sort_by_key(|c| c.created_at);
        Ok(result)
    }

    async fn cache_get_for(
        &self,
        tenant_id: TenantId,
        source_server: SourceServerId,
    ) -> TaxSyncResult<Option<TaxRateCache>> {
        let caches = self.read()?;
        Ok(caches
            .values()
            .find(|c| c.tenant_id == tenant_id && c.source_server == source_server)
            .cloned())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use taxsync_core::{EntityIdType, TaxSyncError};
    use taxsync_test_utils::fixtures;

    // ========================================================================
    // Entry Tests
    // ========================================================================

    #[tokio::test]
    async fn test_entry_create_assigns_ids() {
        let store = InMemoryEntryStore::new();
        let cache_id = CacheId::now_v7();

        let first = store
            .entry_create(&fixtures::complete_entry(cache_id, 0))
            .await
            .unwrap();
        let second = store
            .entry_create(&fixtures::complete_entry(cache_id, 1))
            .await
            .unwrap();

        assert_eq!(first.entry_id, EntryId(1));
        assert_eq!(second.entry_id, EntryId(2));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_entry_create_duplicate_record_number() {
        let store = InMemoryEntryStore::new();
        let cache_id = CacheId::now_v7();

        store
            .entry_create(&fixtures::complete_entry(cache_id, 3))
            .await
            .unwrap();
        let result = store
            .entry_create(&fixtures::complete_entry(cache_id, 3))
            .await;

        assert!(matches!(
            result,
            Err(TaxSyncError::Storage(StorageError::InsertFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_same_record_number_in_different_caches() {
        let store = InMemoryEntryStore::new();
        store
            .entry_create(&fixtures::complete_entry(CacheId::now_v7(), 0))
            .await
            .unwrap();
        store
            .entry_create(&fixtures::complete_entry(CacheId::now_v7(), 0))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_entry_update_moves_position() {
        let store = InMemoryEntryStore::new();
        let cache_id = CacheId::now_v7();
        let mut stored = store
            .entry_create(&fixtures::complete_entry(cache_id, 0))
            .await
            .unwrap();

        stored.record_number = 10;
        stored.rate = 9.5;
        store.entry_update(&stored).await.unwrap();

        assert!(store
            .entry_get_by_record_number(cache_id, 0)
            .await
            .unwrap()
            .is_none());
        let moved = store
            .entry_get_by_record_number(cache_id, 10)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.rate, 9.5);
    }

    #[tokio::test]
    async fn test_entry_update_not_found() {
        let store = InMemoryEntryStore::new();
        let mut entry = fixtures::complete_entry(CacheId::now_v7(), 0);
        entry.entry_id = EntryId(99);

        let result = store.entry_update(&entry).await;
        assert!(matches!(
            result,
            Err(TaxSyncError::Storage(StorageError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_entry_delete_returns_removed() {
        let store = InMemoryEntryStore::new();
        let cache_id = CacheId::now_v7();
        let stored = store
            .entry_create(&fixtures::complete_entry(cache_id, 0))
            .await
            .unwrap();

        let removed = store.entry_delete(&stored).await.unwrap();
        assert_eq!(removed.entry_id, stored.entry_id);
        assert_eq!(store.entry_count(cache_id).await.unwrap(), 0);
        assert!(store.entry_delete(&stored).await.is_err());
    }

    #[tokio::test]
    async fn test_entry_list_is_ordered_by_record_number() {
        let store = InMemoryEntryStore::new();
        let cache_id = CacheId::now_v7();
        for n in [4, 1, 3, 0, 2] {
            store
                .entry_create(&fixtures::complete_entry(cache_id, n))
                .await
                .unwrap();
        }

        let numbers: Vec<_> = store
            .entry_list_by_cache(cache_id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.record_number)
            .collect();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_entry_range() {
        let store = InMemoryEntryStore::new();
        let cache_id = CacheId::now_v7();
        for n in 0..5 {
            store
                .entry_create(&fixtures::complete_entry(cache_id, n))
                .await
                .unwrap();
        }

        let page = store.entry_range(cache_id, 2, 2).await.unwrap();
        let numbers: Vec<_> = page.iter().map(|e| e.record_number).collect();
        assert_eq!(numbers, vec![2, 3]);

        let tail = store.entry_range(cache_id, 4, 10).await.unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_delete_all_scoped_to_cache() {
        let store = InMemoryEntryStore::new();
        let doomed = CacheId::now_v7();
        let kept = CacheId::now_v7();
        for n in 0..3 {
            store
                .entry_create(&fixtures::complete_entry(doomed, n))
                .await
                .unwrap();
        }
        store
            .entry_create(&fixtures::complete_entry(kept, 0))
            .await
            .unwrap();

        assert_eq!(store.entry_delete_all(doomed).await.unwrap(), 3);
        assert_eq!(store.entry_count(doomed).await.unwrap(), 0);
        assert_eq!(store.entry_count(kept).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = InMemoryEntryStore::new();
        store.inject_failure(Some(StorageError::TransactionFailed {
            reason: "disk full".to_string(),
        }));
        assert!(store.entry_count(CacheId::now_v7()).await.is_err());

        store.inject_failure(None);
        assert_eq!(store.entry_count(CacheId::now_v7()).await.unwrap(), 0);
    }

    // ========================================================================
    // Session Tests
    // ========================================================================

    #[tokio::test]
    async fn test_cache_create_get() {
        let sessions = InMemorySessionStore::new();
        let cache = TaxRateCache::new(TenantId::now_v7(), SourceServerId::now_v7());

        sessions.cache_create(&cache).await.unwrap();
        let fetched = sessions.cache_get(cache.cache_id).await.unwrap();
        assert_eq!(fetched, Some(cache.clone()));

        let by_pair = sessions
            .cache_get_for(cache.tenant_id, cache.source_server)
            .await
            .unwrap();
        assert_eq!(by_pair, Some(cache));
    }

    #[tokio::test]
    async fn test_cache_one_per_pair() {
        let sessions = InMemorySessionStore::new();
        let tenant = TenantId::now_v7();
        let server = SourceServerId::now_v7();

        sessions
            .cache_create(&TaxRateCache::new(tenant, server))
            .await
            .unwrap();
        let result = sessions
            .cache_create(&TaxRateCache::new(tenant, server))
            .await;
        assert!(result.is_err());

        sessions
            .cache_create(&TaxRateCache::new(tenant, SourceServerId::now_v7()))
            .await
            .unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[tokio::test]
    async fn test_cache_list_by_source_server() {
        let sessions = InMemorySessionStore::new();
        let server = SourceServerId::now_v7();
        for _ in 0..3 {
            sessions
                .cache_create(&TaxRateCache::new(TenantId::now_v7(), server))
                .await
                .unwrap();
        }
        sessions
            .cache_create(&TaxRateCache::new(TenantId::now_v7(), SourceServerId::now_v7()))
            .await
            .unwrap();

        let caches = sessions.cache_list_by_source_server(server).await.unwrap();
        assert_eq!(caches.len(), 3);
        assert!(caches.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_cache_get_by_tenant_and_delete() {
        let sessions = InMemorySessionStore::new();
        let cache = TaxRateCache::new(TenantId::now_v7(), SourceServerId::now_v7());
        sessions.cache_create(&cache).await.unwrap();

        let fetched = sessions.cache_get_by_tenant(cache.tenant_id).await.unwrap();
        assert_eq!(fetched.map(|c| c.cache_id), Some(cache.cache_id));

        sessions.cache_delete(&cache).await.unwrap();
        assert!(sessions.cache_get(cache.cache_id).await.unwrap().is_none());
        assert!(sessions.cache_delete(&cache).await.is_err());
    }

    #[tokio::test]
    async fn test_session_injected_failure() {
        let sessions = InMemorySessionStore::new();
        let cache = TaxRateCache::new(TenantId::now_v7(), SourceServerId::now_v7());
        sessions.inject_failure(Some(StorageError::LockPoisoned));

        let err = sessions.cache_create(&cache).await.unwrap_err();
        assert!(matches!(err, TaxSyncError::Storage(StorageError::LockPoisoned)));
        assert!(sessions.cache_get(cache.cache_id).await.is_err());
        assert!(sessions.is_empty());

        sessions.inject_failure(None);
        sessions.cache_create(&cache).await.unwrap();
        assert_eq!(sessions.len(), 1);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
