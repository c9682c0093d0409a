//! TAXSYNC Test Utilities
//!
//! Centralized test infrastructure for the TAXSYNC workspace:
//! - Fixtures for complete and deliberately broken cache entries
//! - A small, internally consistent reference catalog
//! - Proptest generators for entries and batches
//! - Custom assertions for repair and storage results

pub use taxsync_core::{
    CacheId, Country, County, CountyRef, DimensionSnapshot, EntityIdType, EntityType, EntryId,
    PostalCode, RecordNumber, SourceServerId, StateProvince, StateProvinceRef, StorageError,
    TaxRateCacheEntry, TaxSyncError, TaxSyncResult, ValidationError, Warehouse,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built reference data and entries.
    //!
    //! The catalog holds two complete geography chains (US/Texas/Travis/78701
    //! served from EAST, CA/Ontario/York/L4B served from WEST) plus the
    //! DFLT warehouse. Every fixture entry starts as a complete copy of the
    //! US chain; the `break_*` helpers damage exactly one dimension.

    use super::*;

    pub fn default_warehouse() -> Warehouse {
        Warehouse::new(1, "DFLT", "Default")
    }

    pub fn east_warehouse() -> Warehouse {
        Warehouse::new(10, "EAST", "East Coast")
    }

    pub fn west_warehouse() -> Warehouse {
        Warehouse::new(11, "WEST", "West Coast")
    }

    /// Fallback country for the Country pass.
    pub fn default_country() -> Country {
        Country {
            id: 1,
            code: "ZZ".to_string(),
            name: "Unknown".to_string(),
            iso2: "ZZ".to_string(),
            iso3: "ZZZ".to_string(),
            iso_numeric: "999".to_string(),
            warehouse: Some(default_warehouse()),
        }
    }

    pub fn united_states() -> Country {
        Country {
            id: 840,
            code: "US".to_string(),
            name: "United States".to_string(),
            iso2: "US".to_string(),
            iso3: "USA".to_string(),
            iso_numeric: "840".to_string(),
            warehouse: Some(east_warehouse()),
        }
    }

    pub fn canada() -> Country {
        Country {
            id: 124,
            code: "CA".to_string(),
            name: "Canada".to_string(),
            iso2: "CA".to_string(),
            iso3: "CAN".to_string(),
            iso_numeric: "124".to_string(),
            warehouse: Some(west_warehouse()),
        }
    }

    pub fn texas() -> StateProvince {
        StateProvince {
            id: 48,
            name: "Texas".to_string(),
            abbreviation: "TX".to_string(),
            warehouse: Some(east_warehouse()),
            country: united_states(),
        }
    }

    pub fn ontario() -> StateProvince {
        StateProvince {
            id: 35,
            name: "Ontario".to_string(),
            abbreviation: "ON".to_string(),
            warehouse: Some(west_warehouse()),
            country: canada(),
        }
    }

    pub fn travis_county() -> County {
        County {
            id: 453,
            code: "453".to_string(),
            name: "Travis".to_string(),
            warehouse: Some(east_warehouse()),
            state_province: texas().to_ref(),
            country: united_states(),
        }
    }

    pub fn york_region() -> County {
        County {
            id: 3519,
            code: "3519".to_string(),
            name: "York".to_string(),
            warehouse: Some(west_warehouse()),
            state_province: ontario().to_ref(),
            country: canada(),
        }
    }

    pub fn austin_postal_code() -> PostalCode {
        PostalCode {
            id: 78701,
            value: "78701".to_string(),
            warehouse: Some(east_warehouse()),
            county: travis_county().to_ref(),
            state_province: texas().to_ref(),
            country: united_states(),
        }
    }

    pub fn markham_postal_code() -> PostalCode {
        PostalCode {
            id: 4,
            value: "L4B 1B9".to_string(),
            warehouse: Some(west_warehouse()),
            county: york_region().to_ref(),
            state_province: ontario().to_ref(),
            country: canada(),
        }
    }

    /// The full reference catalog.
    pub fn sample_snapshot() -> DimensionSnapshot {
        DimensionSnapshot::new()
            .with_warehouses(vec![default_warehouse(), east_warehouse(), west_warehouse()])
            .with_countries(vec![united_states(), canada()])
            .with_state_provinces(vec![texas(), ontario()])
            .with_counties(vec![travis_county(), york_region()])
            .with_postal_codes(vec![austin_postal_code(), markham_postal_code()])
    }

    /// A complete, unsaved entry for the US chain.
    pub fn complete_entry(cache_id: CacheId, record_number: RecordNumber) -> TaxRateCacheEntry {
        TaxRateCacheEntry {
            entry_id: EntryId::UNSAVED,
            cache_id,
            record_number,
            country: united_states(),
            state_province: texas(),
            county: travis_county(),
            postal_code: austin_postal_code(),
            rate: 8.25,
            source_server: SourceServerId::nil(),
        }
    }

    /// `count` complete entries numbered densely from 0.
    pub fn complete_batch(cache_id: CacheId, count: usize) -> Vec<TaxRateCacheEntry> {
        (0..count)
            .map(|n| complete_entry(cache_id, n as RecordNumber))
            .collect()
    }

    /// A warehouse reference with no id and no code.
    pub fn blank_warehouse() -> Warehouse {
        Warehouse::new(0, "", "")
    }

    // === Damage helpers ===

    /// Blank the entry-level Country's warehouse.
    pub fn break_country_warehouse(entry: &mut TaxRateCacheEntry) {
        entry.country.warehouse = Some(blank_warehouse());
    }

    /// Drop every warehouse slot.
    pub fn drop_all_warehouses(entry: &mut TaxRateCacheEntry) {
        for slot in entry.warehouse_slots_mut() {
            *slot = None;
        }
    }

    /// Zero the id of the Country embedded in the PostalCode, keeping codes.
    pub fn break_postal_country_id(entry: &mut TaxRateCacheEntry) {
        entry.postal_code.country.id = 0;
    }

    /// Blank every Country copy beyond recognition.
    pub fn erase_countries(entry: &mut TaxRateCacheEntry) {
        for country in entry.country_copies_mut() {
            let warehouse = country.warehouse.take();
            *country = Country {
                warehouse,
                ..Default::default()
            };
        }
    }

    /// Zero the StateProvince id on the County copy, keeping its codes.
    pub fn break_county_state_id(entry: &mut TaxRateCacheEntry) {
        entry.county.state_province.id = 0;
    }

    /// Blank every StateProvince copy beyond recognition.
    pub fn erase_state_provinces(entry: &mut TaxRateCacheEntry) {
        entry.state_province.id = 0;
        entry.state_province.name.clear();
        entry.state_province.abbreviation.clear();
        entry.county.state_province = StateProvinceRef::default();
        entry.postal_code.state_province = StateProvinceRef::default();
    }

    /// Blank the PostalCode's County name, keeping its id.
    pub fn break_postal_county_name(entry: &mut TaxRateCacheEntry) {
        entry.postal_code.county.name.clear();
    }

    /// Blank every County copy beyond recognition.
    pub fn erase_counties(entry: &mut TaxRateCacheEntry) {
        entry.county.id = 0;
        entry.county.code.clear();
        entry.county.name.clear();
        entry.postal_code.county = CountyRef::default();
    }

    /// Zero the PostalCode id, keeping its value.
    pub fn break_postal_code_id(entry: &mut TaxRateCacheEntry) {
        entry.postal_code.id = 0;
    }

    /// Blank the PostalCode beyond recognition.
    pub fn erase_postal_code(entry: &mut TaxRateCacheEntry) {
        entry.postal_code.id = 0;
        entry.postal_code.value.clear();
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating TAXSYNC entries.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a random UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_cache_id() -> impl Strategy<Value = CacheId> {
        arb_uuid().prop_map(CacheId::new)
    }

    /// Short codes, sometimes blank or padded, sometimes matching the catalog.
    pub fn arb_code() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("  ".to_string()),
            Just("east".to_string()),
            Just(" WEST ".to_string()),
            Just("dflt".to_string()),
            "[A-Z]{2,4}",
        ]
    }

    /// Warehouse slot contents: missing, blank, catalog or random.
    pub fn arb_warehouse_slot() -> impl Strategy<Value = Option<Warehouse>> {
        prop_oneof![
            Just(None),
            Just(Some(fixtures::blank_warehouse())),
            Just(Some(fixtures::east_warehouse())),
            Just(Some(fixtures::west_warehouse())),
            (prop_oneof![Just(0i64), Just(10i64), 100i64..200], arb_code())
                .prop_map(|(id, code)| Some(Warehouse::new(id, code, ""))),
        ]
    }

    /// Which single dimension a generated entry is damaged at.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Damage {
        None,
        CountryWarehouse,
        AllWarehouses,
        PostalCountryId,
        Countries,
        CountyStateId,
        StateProvinces,
        PostalCountyName,
        Counties,
        PostalCodeId,
        PostalCodeErased,
    }

    pub fn arb_damage() -> impl Strategy<Value = Damage> {
        prop_oneof![
            Just(Damage::None),
            Just(Damage::CountryWarehouse),
            Just(Damage::AllWarehouses),
            Just(Damage::PostalCountryId),
            Just(Damage::Countries),
            Just(Damage::CountyStateId),
            Just(Damage::StateProvinces),
            Just(Damage::PostalCountyName),
            Just(Damage::Counties),
            Just(Damage::PostalCodeId),
            Just(Damage::PostalCodeErased),
        ]
    }

    pub fn apply_damage(entry: &mut TaxRateCacheEntry, damage: Damage) {
        match damage {
            Damage::None => {}
            Damage::CountryWarehouse => fixtures::break_country_warehouse(entry),
            Damage::AllWarehouses => fixtures::drop_all_warehouses(entry),
            Damage::PostalCountryId => fixtures::break_postal_country_id(entry),
            Damage::Countries => fixtures::erase_countries(entry),
            Damage::CountyStateId => fixtures::break_county_state_id(entry),
            Damage::StateProvinces => fixtures::erase_state_provinces(entry),
            Damage::PostalCountyName => fixtures::break_postal_county_name(entry),
            Damage::Counties => fixtures::erase_counties(entry),
            Damage::PostalCodeId => fixtures::break_postal_code_id(entry),
            Damage::PostalCodeErased => fixtures::erase_postal_code(entry),
        }
    }

    /// An entry damaged in at most one dimension, with random warehouse slots
    /// layered on top.
    pub fn arb_entry(
        cache_id: CacheId,
        record_number: RecordNumber,
    ) -> impl Strategy<Value = TaxRateCacheEntry> {
        (
            arb_damage(),
            prop::option::weighted(0.3, arb_warehouse_slot()),
            0.0f64..15.0,
        )
            .prop_map(move |(damage, slot_override, rate)| {
                let mut entry = fixtures::complete_entry(cache_id, record_number);
                entry.rate = rate;
                apply_damage(&mut entry, damage);
                if let Some(slot) = slot_override {
                    entry.state_province.warehouse = slot;
                }
                entry
            })
    }

    /// A batch of up to `max_len` entries with distinct record numbers, in
    /// shuffled order.
    pub fn arb_batch(max_len: usize) -> impl Strategy<Value = Vec<TaxRateCacheEntry>> {
        (arb_cache_id(), 0..=max_len)
            .prop_flat_map(|(cache_id, len)| {
                (0..len)
                    .map(|n| arb_entry(cache_id, n as RecordNumber))
                    .collect::<Vec<_>>()
            })
            .prop_shuffle()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for TAXSYNC-specific validation.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &TaxSyncResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &TaxSyncResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a TaxSyncResult is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &TaxSyncResult<T>, entity_type: EntityType) {
        match result {
            Err(TaxSyncError::Storage(StorageError::NotFound {
                entity_type: et, ..
            })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!("Expected NotFound error for {:?}, got: {:?}", entity_type, other),
        }
    }

    /// Assert that a TaxSyncResult is an OutOfRange validation error.
    #[track_caller]
    pub fn assert_out_of_range<T: std::fmt::Debug>(result: &TaxSyncResult<T>) {
        match result {
            Err(TaxSyncError::Validation(ValidationError::OutOfRange { .. })) => {}
            other => panic!("Expected OutOfRange error, got: {:?}", other),
        }
    }

    /// Assert that entries are strictly ordered by record number.
    #[track_caller]
    pub fn assert_record_order(entries: &[TaxRateCacheEntry]) {
        for pair in entries.windows(2) {
            assert!(
                pair[0].record_number < pair[1].record_number,
                "Record {} precedes record {}",
                pair[0].record_number,
                pair[1].record_number
            );
        }
    }

    /// Assert that every warehouse slot of the entry holds `expected`.
    #[track_caller]
    pub fn assert_warehouse_everywhere(entry: &TaxRateCacheEntry, expected: &Warehouse) {
        for (slot, value) in entry.warehouse_slots().iter().enumerate() {
            assert_eq!(
                *value,
                Some(expected),
                "Warehouse slot {} of record {} differs",
                slot,
                entry.record_number
            );
        }
    }

    /// Assert that every Country copy of the entry carries `expected`'s identity.
    #[track_caller]
    pub fn assert_country_everywhere(entry: &TaxRateCacheEntry, expected: &Country) {
        for (copy, country) in entry.country_copies().iter().enumerate() {
            assert!(
                country.same_identity(expected),
                "Country copy {} of record {} is {:?}, expected {:?}",
                copy,
                entry.record_number,
                country,
                expected
            );
        }
    }

    /// Assert that every StateProvince copy of the entry carries `expected`'s identity.
    #[track_caller]
    pub fn assert_state_province_everywhere(entry: &TaxRateCacheEntry, expected: &StateProvince) {
        let expected = expected.to_ref();
        assert_eq!(entry.state_province.to_ref(), expected);
        assert_eq!(entry.county.state_province, expected);
        assert_eq!(entry.postal_code.state_province, expected);
    }

    /// Assert that every County copy of the entry carries `expected`'s identity.
    #[track_caller]
    pub fn assert_county_everywhere(entry: &TaxRateCacheEntry, expected: &County) {
        let expected = expected.to_ref();
        assert_eq!(entry.county.to_ref(), expected);
        assert_eq!(entry.postal_code.county, expected);
    }
}

// ============================================================================
// TESTS
// ============================================================================
