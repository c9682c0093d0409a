use crate::lookup::{Keyed, LookupIndex};
use crate::passes::FixupPass;
use crate::predicates::needs_warehouse_fixup;
use taxsync_core::{Dimension, RepairError, TaxRateCacheEntry, Warehouse};

/// Fills every warehouse slot with one resolved warehouse.
///
/// Candidates are the entry's own slots in level order. When none of them
/// resolves, the caller's default is used, so this pass never faults.
pub struct WarehousePass<'a> {
    index: LookupIndex<'a, Warehouse>,
    default: &'a Warehouse,
}

impl<'a> WarehousePass<'a> {
    pub fn new(warehouses: &'a [Warehouse], default: &'a Warehouse) -> Self {
        Self {
            index: LookupIndex::build(warehouses),
            default,
        }
    }

    pub fn resolve(&self, entry: &TaxRateCacheEntry) -> &'a Warehouse {
        let candidates: Vec<&dyn Keyed> = entry
            .warehouse_slots()
            .into_iter()
            .flatten()
            .map(|w| w as &dyn Keyed)
            .collect();
        self.index.resolve(&candidates).unwrap_or(self.default)
    }
}

impl FixupPass for WarehousePass<'_> {
    fn dimension(&self) -> Dimension {
        Dimension::Warehouse
    }

    fn needs_fixup(&self, entry: &TaxRateCacheEntry) -> bool {
        needs_warehouse_fixup(entry)
    }

    fn repair(&self, entry: &TaxRateCacheEntry) -> Result<TaxRateCacheEntry, RepairError> {
        let resolved = self.resolve(entry);
        let mut repaired = entry.clone();
        for slot in repaired.warehouse_slots_mut() {
            *slot = Some(resolved.clone());
        }
        Ok(repaired)
    }
}
