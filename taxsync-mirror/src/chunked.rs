//! Chunked mirroring and export.
//!
//! Entries are pushed to the mirror one chunk at a time; requests within a
//! chunk run concurrently and the next chunk starts only when the previous
//! one has settled. A failing document never stops the rest of the chunk.

use crate::{AllDocsRow, DocumentMirror};
use futures_util::future::join_all;
use taxsync_core::{
    Attempt, ChunkSize, OperationFailure, TaxRateCacheDocument, TaxRateCacheEntry, TaxSyncResult,
    ValidationError,
};

/// Outcome of mirroring a batch of entries.
#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Documents written successfully, with their assigned revisions.
    pub documents: Vec<TaxRateCacheDocument>,
    /// Documents that could not be written, with the reason.
    pub failures: Vec<OperationFailure<TaxRateCacheDocument>>,
    pub chunks: usize,
}

impl MirrorReport {
    pub fn mirrored(&self) -> usize {
        self.documents.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Create one document per entry, `chunk_size` requests at a time.
///
/// Entries that were never saved have no stable id and are reported as
/// failures without a request being made.
pub async fn mirror_entries<M: DocumentMirror + ?Sized>(
    mirror: &M,
    entries: &[TaxRateCacheEntry],
    chunk_size: ChunkSize,
) -> MirrorReport {
    let mut report = MirrorReport::default();

    for (index, chunk) in entries.chunks(chunk_size.get()).enumerate() {
        let results = join_all(chunk.iter().map(|entry| async move {
            let document = TaxRateCacheDocument::from(entry);
            if entry.entry_id.is_unsaved() {
                let unsaved: TaxSyncResult<TaxRateCacheDocument> =
                    Err(ValidationError::InvalidValue {
                        field: "entry_id".to_string(),
                        reason: format!("entry {} has not been saved", entry.record_number),
                    }
                    .into());
                return unsaved.attempting("mirror create", document);
            }
            mirror
                .create(&document)
                .await
                .attempting("mirror create", document)
        }))
        .await;

        let before = report.failures.len();
        for result in results {
            match result {
                Ok(document) => report.documents.push(document),
                Err(failure) => report.failures.push(failure),
            }
        }
        report.chunks += 1;

        tracing::info!(
            chunk = index,
            size = chunk.len(),
            failed = report.failures.len() - before,
            mirrored = report.documents.len(),
            "Mirrored chunk"
        );
    }

    for failure in &report.failures {
        tracing::warn!(
            id = %failure.input.id,
            record_number = failure.input.record_number,
            error = %failure.source,
            "Mirror write failed"
        );
    }

    report
}

/// Delete the documents of entries that no longer exist in the store.
///
/// Documents already missing from the mirror count as retired. Returns how
/// many documents were deleted and the failures.
pub async fn retire_entries<M: DocumentMirror + ?Sized>(
    mirror: &M,
    entries: &[TaxRateCacheEntry],
    chunk_size: ChunkSize,
) -> (usize, Vec<OperationFailure<TaxRateCacheDocument>>) {
    let mut deleted = 0;
    let mut failures = Vec::new();

    for chunk in entries.chunks(chunk_size.get()) {
        let results = join_all(chunk.iter().map(|entry| async move {
            let document = TaxRateCacheDocument::from(entry);
            let current = match mirror.get(&document.id).await {
                Ok(Some(current)) => current,
                Ok(None) => return Ok(false),
                Err(e) => return Err(OperationFailure::new("mirror retire", document, e)),
            };
            mirror
                .delete(&current)
                .await
                .map(|_| true)
                .attempting("mirror retire", current)
        }))
        .await;

        for result in results {
            match result {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(failure) => failures.push(failure),
            }
        }
    }

    tracing::info!(deleted, failed = failures.len(), "Retired mirror documents");
    (deleted, failures)
}

/// Walk the whole bulk listing, `chunk_size` rows per request.
pub async fn export_all<M: DocumentMirror + ?Sized>(
    mirror: &M,
    chunk_size: ChunkSize,
) -> TaxSyncResult<Vec<AllDocsRow>> {
    let limit = chunk_size.get();
    let mut rows = Vec::new();
    let mut skip = 0usize;

    loop {
        let page = mirror.list_all(skip, limit).await.inspect_err(|e| {
            tracing::error!(skip, limit, error = %e, "Mirror export failed");
        })?;
        let fetched = page.rows.len();
        rows.extend(page.rows);
        skip += fetched;

        tracing::debug!(skip, total_rows = page.total_rows, "Exported mirror page");

        if fetched == 0 || skip as u64 >= page.total_rows {
            break;
        }
    }

    Ok(rows)
}
