use crate::lookup::{Keyed, LookupIndex};
use crate::passes::{unresolved, FixupPass};
use crate::predicates::needs_state_province_fixup;
use taxsync_core::{Dimension, RepairError, StateProvince, TaxRateCacheEntry};

/// Writes one resolved StateProvince identity into the entry's own
/// StateProvince and the copies held by County and PostalCode.
///
/// Without a match the entry is left as it was and the pass records an
/// unresolved fault.
pub struct StateProvincePass<'a> {
    index: LookupIndex<'a, StateProvince>,
}

impl<'a> StateProvincePass<'a> {
    pub fn new(state_provinces: &'a [StateProvince]) -> Self {
        Self {
            index: LookupIndex::build(state_provinces),
        }
    }

    pub fn resolve(&self, entry: &TaxRateCacheEntry) -> Option<&'a StateProvince> {
        let candidates: [&dyn Keyed; 3] = [
            &entry.state_province,
            &entry.county.state_province,
            &entry.postal_code.state_province,
        ];
        self.index.resolve(&candidates)
    }
}

impl FixupPass for StateProvincePass<'_> {
    fn dimension(&self) -> Dimension {
        Dimension::StateProvince
    }

    fn needs_fixup(&self, entry: &TaxRateCacheEntry) -> bool {
        needs_state_province_fixup(entry)
    }

    fn repair(&self, entry: &TaxRateCacheEntry) -> Result<TaxRateCacheEntry, RepairError> {
        let resolved = self.resolve(entry).ok_or_else(|| {
            unresolved(
                Dimension::StateProvince,
                entry.record_number,
                "no state or province matched by id, abbreviation or name",
            )
        })?;
        let mut repaired = entry.clone();
        repaired.assign_state_province(resolved);
        Ok(repaired)
    }
}
