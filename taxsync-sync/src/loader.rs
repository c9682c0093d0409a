//! Dimension snapshot loading.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use taxsync_core::{
    DimensionSnapshot, SourceServerId, StorageError, TaxSyncResult, TenantId,
};

/// Supplies the reference catalogs a repair run joins against.
///
/// Loaders are injected into the service; nothing is read from global state.
#[async_trait]
pub trait DimensionLoader: Send + Sync {
    async fn load(
        &self,
        tenant_id: TenantId,
        source_server: SourceServerId,
    ) -> TaxSyncResult<Arc<DimensionSnapshot>>;
}

/// Serves one prebuilt snapshot for every tenant, with optional per-tenant
/// overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticDimensionLoader {
    snapshot: Arc<DimensionSnapshot>,
    overrides: Arc<RwLock<HashMap<TenantId, Arc<DimensionSnapshot>>>>,
}

impl StaticDimensionLoader {
    pub fn new(snapshot: DimensionSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
            overrides: Arc::default(),
        }
    }

    /// Serve `snapshot` to `tenant_id` instead of the shared one.
    pub fn set_tenant_snapshot(
        &self,
        tenant_id: TenantId,
        snapshot: DimensionSnapshot,
    ) -> TaxSyncResult<()> {
        let mut overrides = self
            .overrides
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        overrides.insert(tenant_id, Arc::new(snapshot));
        Ok(())
    }
}

#[async_trait]
impl DimensionLoader for StaticDimensionLoader {
    async fn load(
        &self,
        tenant_id: TenantId,
        _source_server: SourceServerId,
    ) -> TaxSyncResult<Arc<DimensionSnapshot>> {
        let overrides = self
            .overrides
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        let snapshot = overrides
            .get(&tenant_id)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.snapshot));

        tracing::debug!(
            tenant_id = %tenant_id,
            records = snapshot.len(),
            "Loaded dimension snapshot"
        );
        Ok(snapshot)
    }
}
