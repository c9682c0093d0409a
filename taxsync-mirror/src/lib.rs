//! TAXSYNC Mirror - Document Store Copy of Cache Entries
//!
//! The document mirror is a derived, eventually-consistent copy of the
//! entry store, shaped for consumers that read documents rather than rows.
//! This crate defines the [`DocumentMirror`] contract, a CouchDB-style HTTP
//! implementation, an in-memory implementation, and chunked mirroring and
//! export driven by [`ChunkSize`](taxsync_core::ChunkSize).

pub mod chunked;
pub mod http;

pub use chunked::{export_all, mirror_entries, retire_entries, MirrorReport};
pub use http::{basic_auth_header, HttpDocumentMirror};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use taxsync_core::{
    is_blank, MirrorError, StorageError, TaxRateCacheDocument, TaxSyncResult, ValidationError,
};

// ============================================================================
// MIRROR TRAIT
// ============================================================================

/// Document store holding one document per cache entry.
///
/// Each call is a single request with commit-or-fail semantics. Updates and
/// deletes must carry the revision the store last assigned.
#[async_trait]
pub trait DocumentMirror: Send + Sync {
    /// Store a new document. Returns it with the assigned revision.
    async fn create(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument>;

    /// Replace a document at its current revision. Returns it with the new
    /// revision.
    async fn update(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument>;

    /// Delete a document at its current revision. Returns it with the
    /// deletion revision.
    async fn delete(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument>;

    /// Fetch a document by id.
    async fn get(&self, id: &str) -> TaxSyncResult<Option<TaxRateCacheDocument>>;

    /// Raw listing of document ids and revisions, `limit` rows after
    /// skipping `skip`.
    async fn list_all(&self, skip: usize, limit: usize) -> TaxSyncResult<AllDocsPage>;
}

// ============================================================================
// LISTING TYPES
// ============================================================================

/// One page of the bulk listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllDocsPage {
    pub total_rows: u64,
    #[serde(default)]
    pub offset: u64,
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    pub key: String,
    pub value: RevisionValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionValue {
    pub rev: String,
}

// ============================================================================
// ARGUMENT CHECKS
// ============================================================================

pub(crate) fn require_id(document: &TaxRateCacheDocument) -> TaxSyncResult<()> {
    if is_blank(&document.id) {
        return Err(ValidationError::RequiredFieldMissing {
            field: "_id".to_string(),
        }
        .into());
    }
    Ok(())
}

/// New documents must not carry a revision.
pub(crate) fn check_new(document: &TaxRateCacheDocument) -> TaxSyncResult<()> {
    require_id(document)?;
    if document.rev.is_some() {
        return Err(ValidationError::InvalidValue {
            field: "_rev".to_string(),
            reason: format!("new document {} already carries a revision", document.id),
        }
        .into());
    }
    Ok(())
}

/// Updates and deletes must carry the current revision.
pub(crate) fn require_rev(document: &TaxRateCacheDocument) -> TaxSyncResult<&str> {
    require_id(document)?;
    match document.rev.as_deref() {
        Some(rev) if !is_blank(rev) => Ok(rev),
        _ => Err(ValidationError::RequiredFieldMissing {
            field: "_rev".to_string(),
        }
        .into()),
    }
}

// ============================================================================
// IN-MEMORY MIRROR
// ============================================================================

/// In-memory document mirror for tests and embedding.
///
/// Revisions follow the `{generation}-{token}` shape of the HTTP store so
/// that callers cannot tell the two apart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentMirror {
    documents: Arc<RwLock<BTreeMap<String, TaxRateCacheDocument>>>,
    next_token: Arc<AtomicU64>,
    failure: Arc<RwLock<Option<MirrorError>>>,
}

impl InMemoryDocumentMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `error` until cleared with `None`.
    pub fn inject_failure(&self, error: Option<MirrorError>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = error;
        }
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored document, ordered by id.
    pub fn documents(&self) -> Vec<TaxRateCacheDocument> {
        self.documents
            .read()
            .map(|d| d.values().cloned().collect())
            .unwrap_or_default()
    }

    fn next_rev(&self, previous: Option<&str>) -> String {
        let generation = previous
            .and_then(|rev| rev.split('-').next())
            .and_then(|g| g.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{:08x}", generation, token)
    }

    fn write(&self) -> TaxSyncResult<RwLockWriteGuard<'_, BTreeMap<String, TaxRateCacheDocument>>> {
        self.check_failure()?;
        Ok(self.documents.write().map_err(|_| StorageError::LockPoisoned)?)
    }

    fn check_failure(&self) -> TaxSyncResult<()> {
        let failure = self.failure.read().map_err(|_| StorageError::LockPoisoned)?;
        match failure.as_ref() {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }
}

/// The stored revision must match the caller's.
fn check_current(
    stored: Option<&TaxRateCacheDocument>,
    id: &str,
    rev: &str,
) -> TaxSyncResult<()> {
    match stored {
        None => Err(MirrorError::NotFound { id: id.to_string() }.into()),
        Some(current) if current.rev.as_deref() != Some(rev) => {
            Err(MirrorError::Conflict { id: id.to_string() }.into())
        }
        Some(_) => Ok(()),
    }
}

#[async_trait]
impl DocumentMirror for InMemoryDocumentMirror {
    async fn create(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument> {
        check_new(document)?;
        let mut documents = self.write()?;
        if documents.contains_key(&document.id) {
            return Err(MirrorError::Conflict {
                id: document.id.clone(),
            }
            .into());
        }

        let mut stored = document.clone();
        stored.rev = Some(self.next_rev(None));
        documents.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument> {
        let rev = require_rev(document)?;
        let mut documents = self.write()?;
        check_current(documents.get(&document.id), &document.id, rev)?;

        let mut stored = document.clone();
        stored.rev = Some(self.next_rev(Some(rev)));
        documents.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, document: &TaxRateCacheDocument) -> TaxSyncResult<TaxRateCacheDocument> {
        let rev = require_rev(document)?;
        let mut documents = self.write()?;
        check_current(documents.get(&document.id), &document.id, rev)?;

        documents.remove(&document.id);
        let mut removed = document.clone();
        removed.rev = Some(self.next_rev(Some(rev)));
        Ok(removed)
    }

    async fn get(&self, id: &str) -> TaxSyncResult<Option<TaxRateCacheDocument>> {
        self.check_failure()?;
        let documents = self.documents.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(documents.get(id).cloned())
    }

    async fn list_all(&self, skip: usize, limit: usize) -> TaxSyncResult<AllDocsPage> {
        self.check_failure()?;
        let documents = self.documents.read().map_err(|_| StorageError::LockPoisoned)?;
        let rows = documents
            .values()
            .skip(skip)
            .take(limit)
            .map(|doc| AllDocsRow {
                id: doc.id.clone(),
                key: doc.id.clone(),
                value: RevisionValue {
                    rev: doc.rev.clone().unwrap_or_default(),
                },
            })
            .collect();

        Ok(AllDocsPage {
            total_rows: documents.len() as u64,
            offset: skip as u64,
            rows,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use taxsync_core::{CacheId, EntityIdType, EntryId, TaxSyncError};
    use taxsync_test_utils::fixtures;

    fn document(id: i64) -> TaxRateCacheDocument {
        let mut entry = fixtures::complete_entry(CacheId::now_v7(), id);
        entry.entry_id = EntryId(id);
        TaxRateCacheDocument::from(&entry)
    }

    #[tokio::test]
    async fn test_create_assigns_first_generation_rev() {
        let mirror = InMemoryDocumentMirror::new();
        let created = mirror.create(&document(1)).await.unwrap();

        let rev = created.rev.clone().unwrap();
        assert!(rev.starts_with("1-"));
        assert_eq!(mirror.get("1").await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_create_rejects_existing_id_and_preset_rev() {
        let mirror = InMemoryDocumentMirror::new();
        mirror.create(&document(1)).await.unwrap();

        let dup = mirror.create(&document(1)).await.unwrap_err();
        assert!(matches!(dup, TaxSyncError::Mirror(MirrorError::Conflict { .. })));

        let mut with_rev = document(2);
        with_rev.rev = Some("1-abc".to_string());
        assert!(mirror.create(&with_rev).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_update_bumps_generation_and_detects_stale_rev() {
        let mirror = InMemoryDocumentMirror::new();
        let created = mirror.create(&document(1)).await.unwrap();

        let mut changed = created.clone();
        changed.rate = 9.0;
        let updated = mirror.update(&changed).await.unwrap();
        assert!(updated.rev.as_deref().unwrap().starts_with("2-"));

        let stale = mirror.update(&changed).await.unwrap_err();
        assert!(matches!(stale, TaxSyncError::Mirror(MirrorError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_and_delete_require_rev() {
        let mirror = InMemoryDocumentMirror::new();
        assert!(mirror.update(&document(1)).await.unwrap_err().is_validation());
        assert!(mirror.delete(&document(1)).await.unwrap_err().is_validation());

        let mut missing = document(5);
        missing.rev = Some("1-0".to_string());
        let err = mirror.delete(&missing).await.unwrap_err();
        assert!(matches!(err, TaxSyncError::Mirror(MirrorError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let mirror = InMemoryDocumentMirror::new();
        let created = mirror.create(&document(3)).await.unwrap();
        mirror.delete(&created).await.unwrap();

        assert!(mirror.is_empty());
        assert_eq!(mirror.get("3").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_all_pages_in_id_order() {
        let mirror = InMemoryDocumentMirror::new();
        for id in [3, 1, 2] {
            mirror.create(&document(id)).await.unwrap();
        }

        let page = mirror.list_all(1, 5).await.unwrap();
        assert_eq!(page.total_rows, 3);
        assert_eq!(page.offset, 1);
        let ids: Vec<_> = page.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(page.rows[0].key, "2");
        assert!(page.rows[0].value.rev.starts_with("1-"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mirror = InMemoryDocumentMirror::new();
        mirror.inject_failure(Some(MirrorError::Transport {
            reason: "connection reset".to_string(),
        }));
        assert!(mirror.create(&document(1)).await.is_err());
        assert!(mirror.list_all(0, 10).await.is_err());

        mirror.inject_failure(None);
        assert!(mirror.create(&document(1)).await.is_ok());
    }

    #[test]
    fn test_all_docs_page_parses_couch_body() {
        let body = r#"{
            "total_rows": 2, "offset": 0,
            "rows": [
                {"id": "1", "key": "1", "value": {"rev": "1-a"}},
                {"id": "2", "key": "2", "value": {"rev": "3-b"}}
            ]
        }"#;
        let page: AllDocsPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.total_rows, 2);
        assert_eq!(page.rows[1].value.rev, "3-b");
    }
}
