//! Per-dimension incompleteness checks.
//!
//! Each predicate decides whether an entry belongs to the `filtered` set of
//! its pass. They only read the entry and never consult reference data.

use taxsync_core::{is_blank, Country, TaxRateCacheEntry, Warehouse};

/// A warehouse slot is incomplete when missing, unnumbered or uncoded.
pub fn warehouse_incomplete(slot: Option<&Warehouse>) -> bool {
    match slot {
        None => true,
        Some(w) => w.id == 0 || is_blank(&w.code),
    }
}

/// A Country copy is incomplete when unnumbered or any identifying text is blank.
pub fn country_incomplete(country: &Country) -> bool {
    country.id == 0
        || is_blank(&country.code)
        || is_blank(&country.name)
        || is_blank(&country.iso2)
        || is_blank(&country.iso3)
        || is_blank(&country.iso_numeric)
}

pub fn needs_warehouse_fixup(entry: &TaxRateCacheEntry) -> bool {
    entry
        .warehouse_slots()
        .into_iter()
        .any(warehouse_incomplete)
}

pub fn needs_country_fixup(entry: &TaxRateCacheEntry) -> bool {
    entry
        .country_copies()
        .into_iter()
        .any(country_incomplete)
}

pub fn needs_state_province_fixup(entry: &TaxRateCacheEntry) -> bool {
    let own = &entry.state_province;
    let copies = [
        (own.id, own.name.as_str(), own.abbreviation.as_str()),
        (
            entry.county.state_province.id,
            entry.county.state_province.name.as_str(),
            entry.county.state_province.abbreviation.as_str(),
        ),
        (
            entry.postal_code.state_province.id,
            entry.postal_code.state_province.name.as_str(),
            entry.postal_code.state_province.abbreviation.as_str(),
        ),
    ];
    copies
        .iter()
        .any(|(id, name, abbreviation)| *id == 0 || is_blank(name) || is_blank(abbreviation))
}

/// Only the County embedded in the PostalCode is inspected.
pub fn needs_county_fixup(entry: &TaxRateCacheEntry) -> bool {
    let county = &entry.postal_code.county;
    county.id == 0 || is_blank(&county.code) || is_blank(&county.name)
}

pub fn needs_postal_code_fixup(entry: &TaxRateCacheEntry) -> bool {
    entry.postal_code.id == 0 || is_blank(&entry.postal_code.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxsync_core::{CacheId, EntityIdType};
    use taxsync_test_utils::fixtures;

    fn entry() -> TaxRateCacheEntry {
        fixtures::complete_entry(CacheId::now_v7(), 0)
    }

    #[test]
    fn test_complete_entry_needs_nothing() {
        let e = entry();
        assert!(!needs_warehouse_fixup(&e));
        assert!(!needs_country_fixup(&e));
        assert!(!needs_state_province_fixup(&e));
        assert!(!needs_county_fixup(&e));
        assert!(!needs_postal_code_fixup(&e));
    }

    #[test]
    fn test_warehouse_slot_states() {
        assert!(warehouse_incomplete(None));
        assert!(warehouse_incomplete(Some(&Warehouse::new(0, "EAST", ""))));
        assert!(warehouse_incomplete(Some(&Warehouse::new(10, "  ", ""))));
        assert!(!warehouse_incomplete(Some(&Warehouse::new(10, "EAST", ""))));
    }

    #[test]
    fn test_nested_country_warehouse_counts() {
        let mut e = entry();
        e.county.country.warehouse = None;
        assert!(needs_warehouse_fixup(&e));
    }

    #[test]
    fn test_country_blank_iso_numeric() {
        let mut e = entry();
        e.state_province.country.iso_numeric = " ".to_string();
        assert!(needs_country_fixup(&e));
        assert!(!needs_warehouse_fixup(&e));
    }

    #[test]
    fn test_state_copy_on_postal_code() {
        let mut e = entry();
        e.postal_code.state_province.abbreviation.clear();
        assert!(needs_state_province_fixup(&e));
    }

    #[test]
    fn test_county_checks_postal_copy_only() {
        let mut e = entry();
        e.county.id = 0;
        assert!(!needs_county_fixup(&e));

        fixtures::break_postal_county_name(&mut e);
        assert!(needs_county_fixup(&e));
    }

    #[test]
    fn test_postal_code_predicate() {
        let mut e = entry();
        fixtures::break_postal_code_id(&mut e);
        assert!(needs_postal_code_fixup(&e));
    }
}
