use crate::lookup::{Keyed, LookupIndex};
use crate::passes::{unresolved, FixupPass};
use crate::predicates::needs_postal_code_fixup;
use taxsync_core::{Dimension, PostalCode, RepairError, TaxRateCacheEntry};

/// Restores the entry's PostalCode identity. Ancestor copies inside the
/// PostalCode are left alone; unmatched entries are left as they were.
pub struct PostalCodePass<'a> {
    index: LookupIndex<'a, PostalCode>,
}

impl<'a> PostalCodePass<'a> {
    pub fn new(postal_codes: &'a [PostalCode]) -> Self {
        Self {
            index: LookupIndex::build(postal_codes),
        }
    }

    pub fn resolve(&self, entry: &TaxRateCacheEntry) -> Option<&'a PostalCode> {
        let candidates: [&dyn Keyed; 1] = [&entry.postal_code];
        self.index.resolve(&candidates)
    }
}

impl FixupPass for PostalCodePass<'_> {
    fn dimension(&self) -> Dimension {
        Dimension::PostalCode
    }

    fn needs_fixup(&self, entry: &TaxRateCacheEntry) -> bool {
        needs_postal_code_fixup(entry)
    }

    fn repair(&self, entry: &TaxRateCacheEntry) -> Result<TaxRateCacheEntry, RepairError> {
        let resolved = self.resolve(entry).ok_or_else(|| {
            unresolved(
                Dimension::PostalCode,
                entry.record_number,
                "no postal code matched by id or value",
            )
        })?;
        let mut repaired = entry.clone();
        repaired.postal_code.assign_identity(resolved);
        Ok(repaired)
    }
}
