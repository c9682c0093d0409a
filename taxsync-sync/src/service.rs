//! Reconciliation service: one refresh cycle end to end.
//!
//! The service owns no state of its own. Every dependency is injected:
//! the entry store, the session ledger, the document mirror and the
//! dimension loader. Mutations are individual store calls; there is no
//! transaction spanning a refresh.

use crate::loader::DimensionLoader;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use taxsync_core::{
    Attempt, CacheId, ChunkSize, EntryId, OperationFailure, RecordNumber, RepairError,
    SourceServerId, SyncConfig, TaxRateCache, TaxRateCacheEntry, TaxSyncResult, TenantId,
    ValidationError,
};
use taxsync_mirror::{
    export_all, mirror_entries, retire_entries, AllDocsRow, DocumentMirror, MirrorReport,
};
use taxsync_repair::{
    assign_record_numbers, CancellationFlag, EntryFault, PassSummary, RepairDefaults,
    RepairPipeline,
};
use taxsync_storage::{
    CacheSessionStore, EntryStore, FreshnessOracle, PayloadAccessor, RefreshDecision,
};

/// The (tenant, source server) pair a cache generation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncTarget {
    pub tenant_id: TenantId,
    pub source_server: SourceServerId,
}

impl SyncTarget {
    pub fn new(tenant_id: TenantId, source_server: SourceServerId) -> Self {
        Self {
            tenant_id,
            source_server,
        }
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.source_server)
    }
}

/// What a refresh call did.
#[derive(Debug)]
pub struct RefreshReport {
    pub cache: TaxRateCache,
    pub decision: RefreshDecision,
    /// Per-pass counters; empty when no refresh ran.
    pub passes: Vec<PassSummary>,
    /// Entries the pipeline could not fully repair. They were stored as-is.
    pub faults: Vec<EntryFault>,
    /// Entries removed from the previous generation.
    pub removed: i64,
    /// Entries of the new generation, as stored.
    pub stored: Vec<TaxRateCacheEntry>,
    pub mirror: MirrorReport,
    /// Mirror documents of the previous generation that were deleted.
    pub retired: usize,
}

impl RefreshReport {
    fn skipped(cache: TaxRateCache, decision: RefreshDecision) -> Self {
        Self {
            cache,
            decision,
            passes: Vec::new(),
            faults: Vec::new(),
            removed: 0,
            stored: Vec::new(),
            mirror: MirrorReport::default(),
            retired: 0,
        }
    }

    pub fn refreshed(&self) -> bool {
        self.decision.needs_refresh()
    }

    pub fn total_fixed(&self) -> usize {
        self.passes.iter().map(|p| p.fixed).sum()
    }
}

/// Runs refresh cycles over injected stores.
pub struct ReconciliationService<E, S, M, L>
where
    E: EntryStore,
    S: CacheSessionStore,
    M: DocumentMirror,
    L: DimensionLoader,
{
    entries: Arc<E>,
    sessions: Arc<S>,
    mirror: Arc<M>,
    loader: Arc<L>,
    oracle: FreshnessOracle<E>,
    payload: PayloadAccessor<E>,
    pipeline: RepairPipeline,
    defaults: RepairDefaults,
    chunk_size: ChunkSize,
}

impl<E, S, M, L> ReconciliationService<E, S, M, L>
where
    E: EntryStore + 'static,
    S: CacheSessionStore + 'static,
    M: DocumentMirror + 'static,
    L: DimensionLoader + 'static,
{
    pub fn new(
        entries: Arc<E>,
        sessions: Arc<S>,
        mirror: Arc<M>,
        loader: Arc<L>,
        defaults: RepairDefaults,
    ) -> Self {
        Self {
            oracle: FreshnessOracle::new(Arc::clone(&entries)),
            payload: PayloadAccessor::new(Arc::clone(&entries)),
            entries,
            sessions,
            mirror,
            loader,
            pipeline: RepairPipeline::new(),
            defaults,
            chunk_size: ChunkSize::default(),
        }
    }

    /// Apply chunk size and worker count from configuration.
    pub fn with_config(mut self, config: &SyncConfig) -> Self {
        self.chunk_size = config.chunk_size();
        self.pipeline = RepairPipeline::from_config(config).with_cancellation(self.cancellation());
        self
    }

    pub fn with_pipeline(mut self, pipeline: RepairPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Handle for cancelling repair runs.
    ///
    /// A cancel applies to the repair in flight, or to the next one if none
    /// is running. The flag is cleared once that run returns.
    pub fn cancellation(&self) -> CancellationFlag {
        self.pipeline.cancellation()
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    pub fn freshness(&self) -> &FreshnessOracle<E> {
        &self.oracle
    }

    // ------------------------------------------------------------------------
    // Session ledger
    // ------------------------------------------------------------------------

    /// The generation for `target`, created empty when none exists.
    pub async fn ensure_cache(
        &self,
        target: SyncTarget,
    ) -> Result<TaxRateCache, OperationFailure<SyncTarget>> {
        self.resolve_cache(target)
            .await
            .attempting("ensure cache", target)
    }

    async fn resolve_cache(&self, target: SyncTarget) -> TaxSyncResult<TaxRateCache> {
        if let Some(cache) = self
            .sessions
            .cache_get_for(target.tenant_id, target.source_server)
            .await?
        {
            return Ok(cache);
        }

        let cache = self
            .sessions
            .cache_create(&TaxRateCache::new(target.tenant_id, target.source_server))
            .await?;
        tracing::info!(sync_target = %target, cache_id = %cache.cache_id, "Created cache generation");
        Ok(cache)
    }

    /// Remove a generation, its entries and their mirror documents.
    ///
    /// Returns the number of entries removed. Mirror documents that fail to
    /// delete are logged and left behind.
    pub async fn delete_cache(
        &self,
        cache: &TaxRateCache,
    ) -> Result<i64, OperationFailure<TaxRateCache>> {
        self.cascade_delete(cache)
            .await
            .attempting("delete cache", cache.clone())
    }

    async fn cascade_delete(&self, cache: &TaxRateCache) -> TaxSyncResult<i64> {
        let previous = self.entries.entry_list_by_cache(cache.cache_id).await?;
        let removed = self.entries.entry_delete_all(cache.cache_id).await?;
        self.sessions.cache_delete(cache).await?;

        let (retired, failures) =
            retire_entries(self.mirror.as_ref(), &previous, self.chunk_size).await;
        tracing::info!(
            cache_id = %cache.cache_id,
            removed,
            retired,
            mirror_failures = failures.len(),
            "Deleted cache generation"
        );
        Ok(removed)
    }

    // ------------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------------

    /// Rebuild the generation for `target` from `raw_entries` when the
    /// freshness oracle asks for it.
    ///
    /// `external_count` is the count the source system reports; a
    /// non-positive value means it reported none. When a refresh runs, the
    /// batch is repaired on a blocking thread, the old generation is deleted
    /// and the repaired batch is stored and mirrored in chunks. A cancelled
    /// repair leaves the existing generation untouched.
    pub async fn refresh(
        &self,
        target: SyncTarget,
        raw_entries: Vec<TaxRateCacheEntry>,
        external_count: i64,
    ) -> Result<RefreshReport, OperationFailure<SyncTarget>> {
        self.run_refresh(target, raw_entries, external_count)
            .await
            .inspect_err(|e| {
                tracing::error!(sync_target = %target, error = %e, "Refresh failed");
            })
            .attempting("refresh", target)
    }

    async fn run_refresh(
        &self,
        target: SyncTarget,
        raw_entries: Vec<TaxRateCacheEntry>,
        external_count: i64,
    ) -> TaxSyncResult<RefreshReport> {
        let mut batch = raw_entries;
        if assign_record_numbers(&mut batch) {
            tracing::debug!(entries = batch.len(), "Assigned record numbers");
        }
        check_unique_positions(&batch)?;

        let cache = self.resolve_cache(target).await?;
        let decision = self
            .oracle
            .decide(cache.cache_id, Some(external_count))
            .await?;
        if !decision.needs_refresh() {
            return Ok(RefreshReport::skipped(cache, decision));
        }

        let snapshot = self
            .loader
            .load(target.tenant_id, target.source_server)
            .await?;

        for entry in &mut batch {
            entry.entry_id = EntryId::UNSAVED;
            entry.cache_id = cache.cache_id;
            entry.source_server = target.source_server;
        }

        let pipeline = self.pipeline.clone();
        let defaults = self.defaults.clone();
        let repaired = tokio::task::spawn_blocking(move || {
            pipeline.run_all(batch, &snapshot, &defaults)
        })
        .await;
        self.pipeline.cancellation().reset();
        let repaired = repaired.map_err(|e| RepairError::WorkerPanicked {
            reason: format!("repair task failed: {}", e),
        })?;

        if repaired.was_cancelled() {
            tracing::warn!(
                cache_id = %cache.cache_id,
                "Repair cancelled; keeping the existing generation"
            );
            return Err(RepairError::Cancelled.into());
        }

        let previous = self.entries.entry_list_by_cache(cache.cache_id).await?;
        let removed = self.entries.entry_delete_all(cache.cache_id).await?;

        let mut stored = Vec::with_capacity(repaired.entries.len());
        for entry in &repaired.entries {
            stored.push(self.entries.entry_create(entry).await?);
        }

        let mut mirror = mirror_entries(self.mirror.as_ref(), &stored, self.chunk_size).await;
        let (retired, retire_failures) =
            retire_entries(self.mirror.as_ref(), &previous, self.chunk_size).await;
        mirror.failures.extend(retire_failures);

        tracing::info!(
            cache_id = %cache.cache_id,
            decision = %decision,
            removed,
            stored = stored.len(),
            fixed = repaired.total_fixed(),
            faults = repaired.faults.len(),
            mirrored = mirror.mirrored(),
            mirror_failures = mirror.failures.len(),
            retired,
            "Refreshed cache generation"
        );

        Ok(RefreshReport {
            cache,
            decision,
            passes: repaired.passes,
            faults: repaired.faults,
            removed,
            stored,
            mirror,
            retired,
        })
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Paged read of a generation; see [`PayloadAccessor::get_payload`].
    pub async fn payload(
        &self,
        cache_id: CacheId,
        start: RecordNumber,
        count: i64,
    ) -> TaxSyncResult<Vec<TaxRateCacheEntry>> {
        self.payload.get_payload(cache_id, start, count).await
    }

    pub async fn entry_by_record_number(
        &self,
        cache_id: CacheId,
        record_number: RecordNumber,
    ) -> TaxSyncResult<Option<TaxRateCacheEntry>> {
        self.payload
            .get_entry_by_record_number(cache_id, record_number)
            .await
    }

    /// Full listing of the mirror, paged by the configured chunk size.
    pub async fn export_mirror(&self) -> TaxSyncResult<Vec<AllDocsRow>> {
        export_all(self.mirror.as_ref(), self.chunk_size).await
    }
}

/// Two entries of one batch may not share a record number.
fn check_unique_positions(batch: &[TaxRateCacheEntry]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(batch.len());
    for entry in batch {
        if !seen.insert(entry.record_number) {
            return Err(ValidationError::InvalidValue {
                field: "record_number".to_string(),
                reason: format!("record number {} appears twice", entry.record_number),
            });
        }
    }
    Ok(())
}

impl<E, S, M, L> fmt::Debug for ReconciliationService<E, S, M, L>
where
    E: EntryStore,
    S: CacheSessionStore,
    M: DocumentMirror,
    L: DimensionLoader,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationService")
            .field("pipeline", &self.pipeline)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
