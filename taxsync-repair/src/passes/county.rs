use crate::lookup::{Keyed, LookupIndex};
use crate::passes::{unresolved, FixupPass};
use crate::predicates::needs_county_fixup;
use taxsync_core::{County, Dimension, RepairError, TaxRateCacheEntry};

/// Writes one resolved County identity into the entry's own County and the
/// copy held by PostalCode. Unmatched entries are left as they were.
pub struct CountyPass<'a> {
    index: LookupIndex<'a, County>,
}

impl<'a> CountyPass<'a> {
    pub fn new(counties: &'a [County]) -> Self {
        Self {
            index: LookupIndex::build(counties),
        }
    }

    pub fn resolve(&self, entry: &TaxRateCacheEntry) -> Option<&'a County> {
        let candidates: [&dyn Keyed; 2] = [&entry.county, &entry.postal_code.county];
        self.index.resolve(&candidates)
    }
}

impl FixupPass for CountyPass<'_> {
    fn dimension(&self) -> Dimension {
        Dimension::County
    }

    fn needs_fixup(&self, entry: &TaxRateCacheEntry) -> bool {
        needs_county_fixup(entry)
    }

    fn repair(&self, entry: &TaxRateCacheEntry) -> Result<TaxRateCacheEntry, RepairError> {
        let resolved = self.resolve(entry).ok_or_else(|| {
            unresolved(
                Dimension::County,
                entry.record_number,
                "no county matched by id, code or name",
            )
        })?;
        let mut repaired = entry.clone();
        repaired.assign_county(resolved);
        Ok(repaired)
    }
}
