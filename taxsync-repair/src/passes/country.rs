use crate::lookup::{Keyed, LookupIndex};
use crate::passes::FixupPass;
use crate::predicates::needs_country_fixup;
use taxsync_core::{Country, Dimension, RepairError, TaxRateCacheEntry};

/// Writes one resolved Country identity into every Country copy.
///
/// Each copy keeps its own warehouse slot. Falls back to the caller's
/// default when no copy resolves.
pub struct CountryPass<'a> {
    index: LookupIndex<'a, Country>,
    default: &'a Country,
}

impl<'a> CountryPass<'a> {
    pub fn new(countries: &'a [Country], default: &'a Country) -> Self {
        Self {
            index: LookupIndex::build(countries),
            default,
        }
    }

    pub fn resolve(&self, entry: &TaxRateCacheEntry) -> &'a Country {
        let candidates: Vec<&dyn Keyed> = entry
            .country_copies()
            .into_iter()
            .map(|c| c as &dyn Keyed)
            .collect();
        self.index.resolve(&candidates).unwrap_or(self.default)
    }
}

impl FixupPass for CountryPass<'_> {
    fn dimension(&self) -> Dimension {
        Dimension::Country
    }

    fn needs_fixup(&self, entry: &TaxRateCacheEntry) -> bool {
        needs_country_fixup(entry)
    }

    fn repair(&self, entry: &TaxRateCacheEntry) -> Result<TaxRateCacheEntry, RepairError> {
        let resolved = self.resolve(entry);
        let mut repaired = entry.clone();
        for copy in repaired.country_copies_mut() {
            copy.assign_identity(resolved);
        }
        Ok(repaired)
    }
}
