//! LMDB-backed entry store and session ledger.
//!
//! Uses the heed crate (Rust bindings for LMDB) as a memory-mapped,
//! transactional store for cache generations and their entries.
//!
//! # Layout
//!
//! Four named databases live in one environment:
//! - `entries`: `CacheScopedKey` -> `[entry_id: 8 bytes BE][json entry]`
//! - `entry_ids`: `entry_id` (8 bytes BE) -> `CacheScopedKey`
//! - `caches`: cache uuid (16 bytes) -> json cache record
//! - `meta`: `last_entry_id` -> last assigned entry id (8 bytes BE)
//!
//! Every trait call runs in exactly one LMDB transaction, so a failed call
//! leaves nothing behind. Deleting a cache removes its entries in the same
//! write transaction.

use std::ops::Bound;
use std::path::Path;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use taxsync_core::{
    CacheId, EntityIdType, EntityType, EntryId, LmdbConfig, RecordNumber, SourceServerId,
    StorageError, TaxRateCache, TaxRateCacheEntry, TaxSyncError, TaxSyncResult, TenantId,
};

use crate::cache_key::CacheScopedKey;
use crate::{CacheSessionStore, EntryStore};

const LAST_ENTRY_ID_KEY: &[u8] = b"last_entry_id";
const ENTRY_ID_LEN: usize = 8;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open a database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for TaxSyncError {
    fn from(e: LmdbStoreError) -> Self {
        TaxSyncError::Storage(StorageError::TransactionFailed {
            reason: e.to_string(),
        })
    }
}

fn txn_err(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::Transaction(e.to_string())
}

/// LMDB entry store and session ledger.
pub struct LmdbEntryStore {
    env: Env,
    entries: Database<Bytes, Bytes>,
    entry_ids: Database<Bytes, Bytes>,
    caches: Database<Bytes, Bytes>,
    meta: Database<Bytes, Bytes>,
}

impl std::fmt::Debug for LmdbEntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbEntryStore")
            .field("path", &self.env.path())
            .finish()
    }
}

impl LmdbEntryStore {
    /// Open (or create) a store under `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - One of the named databases cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let map_size = max_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| {
                LmdbStoreError::EnvOpen(format!("map size of {max_size_mb} MB overflows"))
            })?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(4)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let mut open = |name: &str| -> Result<Database<Bytes, Bytes>, LmdbStoreError> {
            env.create_database(&mut wtxn, Some(name))
                .map_err(|e| LmdbStoreError::DbOpen(format!("{name}: {e}")))
        };
        let entries = open("entries")?;
        let entry_ids = open("entry_ids")?;
        let caches = open("caches")?;
        let meta = open("meta")?;
        wtxn.commit().map_err(txn_err)?;

        tracing::debug!(path = %path.as_ref().display(), max_size_mb, "Opened LMDB entry store");

        Ok(Self {
            env,
            entries,
            entry_ids,
            caches,
            meta,
        })
    }

    pub fn from_config(config: &LmdbConfig) -> Result<Self, LmdbStoreError> {
        Self::new(&config.path, config.max_size_mb)
    }

    // ------------------------------------------------------------------------
    // Encoding helpers
    // ------------------------------------------------------------------------

    fn encode_entry(entry: &TaxRateCacheEntry) -> Result<Vec<u8>, LmdbStoreError> {
        let json =
            serde_json::to_vec(entry).map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;
        let mut bytes = Vec::with_capacity(ENTRY_ID_LEN + json.len());
        bytes.extend_from_slice(&entry.entry_id.get().to_be_bytes());
        bytes.extend_from_slice(&json);
        Ok(bytes)
    }

    fn decode_entry(bytes: &[u8]) -> Result<TaxRateCacheEntry, LmdbStoreError> {
        if bytes.len() < ENTRY_ID_LEN {
            return Err(LmdbStoreError::Deserialization(
                "entry value shorter than id header".to_string(),
            ));
        }
        serde_json::from_slice(&bytes[ENTRY_ID_LEN..])
            .map_err(|e| LmdbStoreError::Deserialization(e.to_string()))
    }

    fn decode_entry_id(bytes: &[u8]) -> Result<[u8; ENTRY_ID_LEN], LmdbStoreError> {
        bytes
            .get(..ENTRY_ID_LEN)
            .and_then(|header| header.try_into().ok())
            .ok_or_else(|| LmdbStoreError::Deserialization("missing entry id header".to_string()))
    }

    fn decode_cache(bytes: &[u8]) -> Result<TaxRateCache, LmdbStoreError> {
        serde_json::from_slice(bytes).map_err(|e| LmdbStoreError::Deserialization(e.to_string()))
    }

    // ------------------------------------------------------------------------
    // Transaction-scoped helpers
    // ------------------------------------------------------------------------

    fn position_of(&self, txn: &RoTxn, id: EntryId) -> TaxSyncResult<Option<CacheScopedKey>> {
        let bytes = self
            .entry_ids
            .get(txn, &id.get().to_be_bytes())
            .map_err(txn_err)?;
        Ok(bytes.and_then(CacheScopedKey::decode))
    }

    fn occupied(&self, txn: &RoTxn, key: &CacheScopedKey) -> TaxSyncResult<bool> {
        Ok(self
            .entries
            .get(txn, &key.encode())
            .map_err(txn_err)?
            .is_some())
    }

    fn last_entry_id(&self, txn: &RoTxn) -> TaxSyncResult<i64> {
        let bytes = self.meta.get(txn, LAST_ENTRY_ID_KEY).map_err(txn_err)?;
        Ok(bytes
            .and_then(|b| <[u8; 8]>::try_from(b).ok())
            .map(i64::from_be_bytes)
            .unwrap_or(0))
    }

    fn write_entry(&self, wtxn: &mut RwTxn, entry: &TaxRateCacheEntry) -> TaxSyncResult<()> {
        let key = CacheScopedKey::new(entry.cache_id, entry.record_number).encode();
        let value = Self::encode_entry(entry)?;
        self.entries.put(wtxn, &key, &value).map_err(txn_err)?;
        self.entry_ids
            .put(wtxn, &entry.entry_id.get().to_be_bytes(), &key)
            .map_err(txn_err)?;
        Ok(())
    }

    /// Collect `(entry key, entry id)` pairs for every entry of a cache.
    fn cache_entry_keys(
        &self,
        txn: &RoTxn,
        cache_id: CacheId,
    ) -> TaxSyncResult<Vec<(Vec<u8>, [u8; ENTRY_ID_LEN])>> {
        let prefix = CacheScopedKey::cache_prefix(cache_id);
        let iter = self.entries.prefix_iter(txn, &prefix).map_err(txn_err)?;

        let mut keys = Vec::new();
        for result in iter {
            let (key, value) = result.map_err(txn_err)?;
            keys.push((key.to_vec(), Self::decode_entry_id(value)?));
        }
        Ok(keys)
    }

    fn delete_cache_entries(&self, wtxn: &mut RwTxn, cache_id: CacheId) -> TaxSyncResult<i64> {
        let doomed = self.cache_entry_keys(wtxn, cache_id)?;
        for (key, id) in &doomed {
            self.entries.delete(wtxn, key).map_err(txn_err)?;
            self.entry_ids.delete(wtxn, id).map_err(txn_err)?;
        }
        Ok(doomed.len() as i64)
    }

    fn all_caches(&self, txn: &RoTxn) -> TaxSyncResult<Vec<TaxRateCache>> {
        let iter = self.caches.iter(txn).map_err(txn_err)?;
        let mut caches = Vec::new();
        for result in iter {
            let (_, value) = result.map_err(txn_err)?;
            caches.push(Self::decode_cache(value)?);
        }
        Ok(caches)
    }

    fn put_cache(&self, wtxn: &mut RwTxn, cache: &TaxRateCache) -> TaxSyncResult<()> {
        let value =
            serde_json::to_vec(cache).map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;
        self.caches
            .put(wtxn, cache.cache_id.as_uuid().as_bytes(), &value)
            .map_err(txn_err)?;
        Ok(())
    }
}

fn entry_not_found(id: EntryId) -> TaxSyncError {
    StorageError::NotFound {
        entity_type: EntityType::TaxRateCacheEntry,
        id: id.to_string(),
    }
    .into()
}

fn cache_not_found(id: CacheId) -> TaxSyncError {
    StorageError::NotFound {
        entity_type: EntityType::TaxRateCache,
        id: id.to_string(),
    }
    .into()
}

#[async_trait]
impl EntryStore for LmdbEntryStore {
    async fn entry_create(&self, entry: &TaxRateCacheEntry) -> TaxSyncResult<TaxRateCacheEntry> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let position = CacheScopedKey::new(entry.cache_id, entry.record_number);
        if self.occupied(&wtxn, &position)? {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::TaxRateCacheEntry,
                reason: format!(
                    "record number {} already taken in cache {}",
                    entry.record_number, entry.cache_id
                ),
            }
            .into());
        }

        let last_id = self.last_entry_id(&wtxn)?;
        let mut stored = entry.clone();
        if stored.entry_id.is_unsaved() {
            stored.entry_id = EntryId(last_id + 1);
        } else if self.position_of(&wtxn, stored.entry_id)?.is_some() {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::TaxRateCacheEntry,
                reason: format!("entry id {} already exists", stored.entry_id),
            }
            .into());
        }

        self.write_entry(&mut wtxn, &stored)?;
        let new_last = last_id.max(stored.entry_id.get());
        self.meta
            .put(&mut wtxn, LAST_ENTRY_ID_KEY, &new_last.to_be_bytes())
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        Ok(stored)
    }

    async fn entry_update(&self, entry: &TaxRateCacheEntry) -> TaxSyncResult<TaxRateCacheEntry> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let old_position = self
            .position_of(&wtxn, entry.entry_id)?
            .ok_or_else(|| entry_not_found(entry.entry_id))?;
        let new_position = CacheScopedKey::new(entry.cache_id, entry.record_number);

        if old_position != new_position {
            if self.occupied(&wtxn, &new_position)? {
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
            self.entries
                .delete(&mut wtxn, &old_position.encode())
                .map_err(txn_err)?;
        }

        self.write_entry(&mut wtxn, entry)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(entry.clone())
    }

    async fn entry_delete(&self, entry: &TaxRateCacheEntry) -> TaxSyncResult<TaxRateCacheEntry> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let position = self
            .position_of(&wtxn, entry.entry_id)?
            .ok_or_else(|| entry_not_found(entry.entry_id))?;
        let key = position.encode();
        let removed = match self.entries.get(&wtxn, &key).map_err(txn_err)? {
            Some(bytes) => Self::decode_entry(bytes)?,
            None => return Err(entry_not_found(entry.entry_id)),
        };

        self.entries.delete(&mut wtxn, &key).map_err(txn_err)?;
        self.entry_ids
            .delete(&mut wtxn, &entry.entry_id.get().to_be_bytes())
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        Ok(removed)
    }

    async fn entry_get(&self, id: EntryId) -> TaxSyncResult<Option<TaxRateCacheEntry>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let Some(position) = self.position_of(&rtxn, id)? else {
            return Ok(None);
        };
        match self.entries.get(&rtxn, &position.encode()).map_err(txn_err)? {
            Some(bytes) => Ok(Some(Self::decode_entry(bytes)?)),
            None => Ok(None),
        }
    }

    async fn entry_list_by_cache(
        &self,
        cache_id: CacheId,
    ) -> TaxSyncResult<Vec<TaxRateCacheEntry>> {
        self.entry_range(cache_id, RecordNumber::MIN, usize::MAX)
            .await
    }

    async fn entry_count(&self, cache_id: CacheId) -> TaxSyncResult<i64> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let prefix = CacheScopedKey::cache_prefix(cache_id);
        let iter = self.entries.prefix_iter(&rtxn, &prefix).map_err(txn_err)?;

        let mut count = 0i64;
        for result in iter {
            result.map_err(txn_err)?;
            count += 1;
        }
        Ok(count)
    }

    async fn entry_range(
        &self,
        cache_id: CacheId,
        start: RecordNumber,
        count: usize,
    ) -> TaxSyncResult<Vec<TaxRateCacheEntry>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let lower = CacheScopedKey::new(cache_id, start).encode();
        let upper = CacheScopedKey::new(cache_id, RecordNumber::MAX).encode();
        let bounds = (Bound::Included(&lower[..]), Bound::Included(&upper[..]));
        let iter = self.entries.range(&rtxn, &bounds).map_err(txn_err)?;

        let mut page = Vec::new();
        for result in iter.take(count) {
            let (_, value) = result.map_err(txn_err)?;
            page.push(Self::decode_entry(value)?);
        }
        Ok(page)
    }

    async fn entry_get_by_record_number(
        &self,
        cache_id: CacheId,
        record_number: RecordNumber,
    ) -> TaxSyncResult<Option<TaxRateCacheEntry>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let key = CacheScopedKey::new(cache_id, record_number).encode();
        match self.entries.get(&rtxn, &key).map_err(txn_err)? {
            Some(bytes) => Ok(Some(Self::decode_entry(bytes)?)),
            None => Ok(None),
        }
    }

    async fn entry_delete_all(&self, cache_id: CacheId) -> TaxSyncResult<i64> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let deleted = self.delete_cache_entries(&mut wtxn, cache_id)?;
        wtxn.commit().map_err(txn_err)?;

        tracing::debug!(cache_id = %cache_id, deleted, "Deleted cache entries");
        Ok(deleted)
    }
}

#[async_trait]
impl CacheSessionStore for LmdbEntryStore {
    async fn cache_create(&self, cache: &TaxRateCache) -> TaxSyncResult<TaxRateCache> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;

        let existing = self.all_caches(&wtxn)?;
        if existing.iter().any(|c| c.cache_id == cache.cache_id) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::TaxRateCache,
                reason: format!("cache {} already exists", cache.cache_id),
            }
            .into());
        }
        if existing
            .iter()
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

        self.put_cache(&mut wtxn, cache)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(cache.clone())
    }

    async fn cache_update(&self, cache: &TaxRateCache) -> TaxSyncResult<TaxRateCache> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let exists = self
            .caches
            .get(&wtxn, cache.cache_id.as_uuid().as_bytes())
            .map_err(txn_err)?
            .is_some();
        if !exists {
            return Err(cache_not_found(cache.cache_id));
        }

        self.put_cache(&mut wtxn, cache)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(cache.clone())
    }

    async fn cache_delete(&self, cache: &TaxRateCache) -> TaxSyncResult<TaxRateCache> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let key = cache.cache_id.as_uuid();
        let removed = match self.caches.get(&wtxn, key.as_bytes()).map_err(txn_err)? {
            Some(bytes) => Self::decode_cache(bytes)?,
            None => return Err(cache_not_found(cache.cache_id)),
        };

        let entries_removed = self.delete_cache_entries(&mut wtxn, cache.cache_id)?;
        self.caches
            .delete(&mut wtxn, key.as_bytes())
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        tracing::info!(
            cache_id = %cache.cache_id,
            entries_removed,
            "Deleted cache generation"
        );
        Ok(removed)
    }

    async fn cache_get(&self, id: CacheId) -> TaxSyncResult<Option<TaxRateCache>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        match self
            .caches
            .get(&rtxn, id.as_uuid().as_bytes())
            .map_err(txn_err)?
        {
            Some(bytes) => Ok(Some(Self::decode_cache(bytes)?)),
            None => Ok(None),
        }
    }

    async fn cache_get_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> TaxSyncResult<Option<TaxRateCache>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        Ok(self
            .all_caches(&rtxn)?
            .into_iter()
            .filter(|c| c.tenant_id == tenant_id)
            .max_by_key(|c| c.created_at))
    }

    async fn cache_list_by_source_server(
        &self,
        source_server: SourceServerId,
    ) -> TaxSyncResult<Vec<TaxRateCache>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let mut caches: Vec<TaxRateCache> = self
            .all_caches(&rtxn)?
            .into_iter()
            .filter(|c| c.source_server == source_server)
            .collect();
        caches.sort_by_key(|c| c.created_at);
        Ok(caches)
    }

    async fn cache_get_for(
        &self,
        tenant_id: TenantId,
        source_server: SourceServerId,
    ) -> TaxSyncResult<Option<TaxRateCache>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        Ok(self
            .all_caches(&rtxn)?
            .into_iter()
            .find(|c| c.tenant_id == tenant_id && c.source_server == source_server))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxsync_test_utils::fixtures;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbEntryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LmdbEntryStore::new(temp_dir.path(), 10).unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (store, _dir) = create_test_store();
        let cache_id = CacheId::now_v7();

        let stored = store
            .entry_create(&fixtures::complete_entry(cache_id, 0))
            .await
            .unwrap();
        assert_eq!(stored.entry_id, EntryId(1));

        let fetched = store.entry_get(stored.entry_id).await.unwrap();
        assert_eq!(fetched, Some(stored.clone()));

        let by_position = store
            .entry_get_by_record_number(cache_id, 0)
            .await
            .unwrap();
        assert_eq!(by_position, Some(stored));
    }

    #[tokio::test]
    async fn test_duplicate_position_rejected() {
        let (store, _dir) = create_test_store();
        let cache_id = CacheId::now_v7();

        store
            .entry_create(&fixtures::complete_entry(cache_id, 2))
            .await
            .unwrap();
        let result = store
            .entry_create(&fixtures::complete_entry(cache_id, 2))
            .await;
        assert!(matches!(
            result,
            Err(TaxSyncError::Storage(StorageError::InsertFailed { .. }))
        ));
        assert_eq!(store.entry_count(cache_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_range_follows_record_order() {
        let (store, _dir) = create_test_store();
        let cache_id = CacheId::now_v7();
        let other = CacheId::now_v7();

        for n in [7, 0, 300, 2, 256] {
            store
                .entry_create(&fixtures::complete_entry(cache_id, n))
                .await
                .unwrap();
        }
        store
            .entry_create(&fixtures::complete_entry(other, 1))
            .await
            .unwrap();

        let all: Vec<_> = store
            .entry_list_by_cache(cache_id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.record_number)
            .collect();
        assert_eq!(all, vec![0, 2, 7, 256, 300]);

        let page: Vec<_> = store
            .entry_range(cache_id, 3, 2)
            .await
            .unwrap()
            .iter()
            .map(|e| e.record_number)
            .collect();
        assert_eq!(page, vec![7, 256]);
    }

    #[tokio::test]
    async fn test_range_seeks_within_one_cache() {
        let (store, _dir) = create_test_store();
        let cache_id = CacheId::now_v7();
        let next = CacheId::now_v7();

        for n in [-4, 5, 9] {
            store
                .entry_create(&fixtures::complete_entry(cache_id, n))
                .await
                .unwrap();
        }
        for n in [0, 1] {
            store
                .entry_create(&fixtures::complete_entry(next, n))
                .await
                .unwrap();
        }

        let tail: Vec<_> = store
            .entry_range(cache_id, 6, 10)
            .await
            .unwrap()
            .iter()
            .map(|e| (e.cache_id, e.record_number))
            .collect();
        assert_eq!(tail, vec![(cache_id, 9)]);

        assert!(store.entry_range(cache_id, 10, 10).await.unwrap().is_empty());
        assert!(store.entry_range(cache_id, -4, 0).await.unwrap().is_empty());

        let from_negative: Vec<_> = store
            .entry_range(cache_id, RecordNumber::MIN, 2)
            .await
            .unwrap()
            .iter()
            .map(|e| e.record_number)
            .collect();
        assert_eq!(from_negative, vec![-4, 5]);
    }

    #[tokio::test]
    async fn test_update_moves_position() {
        let (store, _dir) = create_test_store();
        let cache_id = CacheId::now_v7();

        let mut stored = store
            .entry_create(&fixtures::complete_entry(cache_id, 0))
            .await
            .unwrap();
        stored.record_number = 5;
        store.entry_update(&stored).await.unwrap();

        assert!(store
            .entry_get_by_record_number(cache_id, 0)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .entry_get_by_record_number(cache_id, 5)
            .await
            .unwrap()
            .is_some());
        assert_eq!(store.entry_count(cache_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let (store, _dir) = create_test_store();
        let cache_id = CacheId::now_v7();

        let mut stored = Vec::new();
        for n in 0..4 {
            stored.push(
                store
                    .entry_create(&fixtures::complete_entry(cache_id, n))
                    .await
                    .unwrap(),
            );
        }

        let removed = store.entry_delete(&stored[0]).await.unwrap();
        assert_eq!(removed.record_number, 0);
        assert!(store.entry_get(stored[0].entry_id).await.unwrap().is_none());

        assert_eq!(store.entry_delete_all(cache_id).await.unwrap(), 3);
        assert_eq!(store.entry_count(cache_id).await.unwrap(), 0);
        assert!(store.entry_get(stored[1].entry_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_keep_increasing_after_delete_all() {
        let (store, _dir) = create_test_store();
        let cache_id = CacheId::now_v7();

        store
            .entry_create(&fixtures::complete_entry(cache_id, 0))
            .await
            .unwrap();
        store.entry_delete_all(cache_id).await.unwrap();
        let next = store
            .entry_create(&fixtures::complete_entry(cache_id, 0))
            .await
            .unwrap();
        assert_eq!(next.entry_id, EntryId(2));
    }

    #[tokio::test]
    async fn test_cache_delete_cascades() {
        let (store, _dir) = create_test_store();
        let cache = TaxRateCache::new(TenantId::now_v7(), SourceServerId::now_v7());
        store.cache_create(&cache).await.unwrap();
        for n in 0..3 {
            store
                .entry_create(&fixtures::complete_entry(cache.cache_id, n))
                .await
                .unwrap();
        }

        store.cache_delete(&cache).await.unwrap();
        assert!(store.cache_get(cache.cache_id).await.unwrap().is_none());
        assert_eq!(store.entry_count(cache.cache_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cache_pair_is_unique() {
        let (store, _dir) = create_test_store();
        let tenant = TenantId::now_v7();
        let server = SourceServerId::now_v7();
        let first = TaxRateCache::new(tenant, server);

        store.cache_create(&first).await.unwrap();
        assert!(store
            .cache_create(&TaxRateCache::new(tenant, server))
            .await
            .is_err());

        let found = store.cache_get_for(tenant, server).await.unwrap();
        assert_eq!(found, Some(first.clone()));
        assert_eq!(
            store.cache_get_by_tenant(tenant).await.unwrap(),
            Some(first)
        );
        assert_eq!(
            store.cache_list_by_source_server(server).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let cache_id = CacheId::now_v7();
        {
            let store = LmdbEntryStore::new(temp_dir.path(), 10).unwrap();
            store
                .entry_create(&fixtures::complete_entry(cache_id, 0))
                .await
                .unwrap();
        }

        let store = LmdbEntryStore::from_config(&LmdbConfig {
            path: temp_dir.path().to_path_buf(),
            max_size_mb: 10,
        })
        .unwrap();
        assert_eq!(store.entry_count(cache_id).await.unwrap(), 1);
    }

    #[test]
    fn test_oversized_map_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = LmdbEntryStore::new(temp_dir.path(), usize::MAX).unwrap_err();
        assert!(matches!(err, LmdbStoreError::EnvOpen(ref reason) if reason.contains("overflows")));
    }

    #[test]
    fn test_error_conversion() {
        let err: TaxSyncError = LmdbStoreError::Transaction("boom".to_string()).into();
        assert!(matches!(
            err,
            TaxSyncError::Storage(StorageError::TransactionFailed { .. })
        ));
    }
}
