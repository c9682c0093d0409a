//! Cache generation, cache entry and mirror document types.

use crate::{
    CacheId, Country, County, EntryId, PostalCode, RecordNumber, SourceServerId, StateProvince,
    TaxSyncResult, TenantId, Timestamp, ValidationError, Warehouse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// SESSION LEDGER
// ============================================================================

/// One cache generation for a (tenant, source server) pair.
///
/// A generation is replaced wholesale on refresh; entries are never patched
/// into an existing generation piecemeal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRateCache {
    pub cache_id: CacheId,
    pub tenant_id: TenantId,
    pub source_server: SourceServerId,
    pub created_at: Timestamp,
}

impl TaxRateCache {
    /// Create a new, empty generation record.
    pub fn new(tenant_id: TenantId, source_server: SourceServerId) -> Self {
        use crate::EntityIdType;
        Self {
            cache_id: CacheId::now_v7(),
            tenant_id,
            source_server,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// CACHE ENTRY
// ============================================================================

/// One computed tax rate for a fully qualified geography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRateCacheEntry {
    pub entry_id: EntryId,
    pub cache_id: CacheId,
    /// Ordinal position, unique within `cache_id`.
    pub record_number: RecordNumber,
    pub country: Country,
    pub state_province: StateProvince,
    pub county: County,
    pub postal_code: PostalCode,
    /// Combined rate as a percentage.
    pub rate: f64,
    pub source_server: SourceServerId,
}

impl TaxRateCacheEntry {
    /// Every embedded warehouse slot, in level order.
    pub fn warehouse_slots(&self) -> [Option<&Warehouse>; 7] {
        [
            self.country.warehouse.as_ref(),
            self.state_province.warehouse.as_ref(),
            self.county.warehouse.as_ref(),
            self.postal_code.warehouse.as_ref(),
            self.state_province.country.warehouse.as_ref(),
            self.county.country.warehouse.as_ref(),
            self.postal_code.country.warehouse.as_ref(),
        ]
    }

    pub fn warehouse_slots_mut(&mut self) -> [&mut Option<Warehouse>; 7] {
        [
            &mut self.country.warehouse,
            &mut self.state_province.warehouse,
            &mut self.county.warehouse,
            &mut self.postal_code.warehouse,
            &mut self.state_province.country.warehouse,
            &mut self.county.country.warehouse,
            &mut self.postal_code.country.warehouse,
        ]
    }

    /// Every embedded Country copy, entry level first.
    pub fn country_copies(&self) -> [&Country; 4] {
        [
            &self.country,
            &self.state_province.country,
            &self.county.country,
            &self.postal_code.country,
        ]
    }

    pub fn country_copies_mut(&mut self) -> [&mut Country; 4] {
        [
            &mut self.country,
            &mut self.state_province.country,
            &mut self.county.country,
            &mut self.postal_code.country,
        ]
    }

    /// Write `state` into every StateProvince copy, keeping ancestor slots.
    pub fn assign_state_province(&mut self, state: &StateProvince) {
        self.state_province.assign_identity(state);
        let state_ref = state.to_ref();
        self.county.state_province = state_ref.clone();
        self.postal_code.state_province = state_ref;
    }

    /// Write `county` into every County copy, keeping ancestor slots.
    pub fn assign_county(&mut self, county: &County) {
        self.county.assign_identity(county);
        self.postal_code.county = county.to_ref();
    }
}

// ============================================================================
// MIRROR DOCUMENT
// ============================================================================

/// Document-store copy of a [`TaxRateCacheEntry`].
///
/// `id` is the stringified entry id; `rev` is assigned by the document store
/// and must accompany every update or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRateCacheDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub cache_id: CacheId,
    pub record_number: RecordNumber,
    pub country: Country,
    pub state_province: StateProvince,
    pub county: County,
    pub postal_code: PostalCode,
    pub rate: f64,
    pub source_server: SourceServerId,
}

impl TaxRateCacheDocument {
    /// Convert back to a relational entry.
    ///
    /// Fails when the document id is not a stringified entry id.
    pub fn into_entry(self) -> TaxSyncResult<TaxRateCacheEntry> {
        let entry_id = self.id.parse::<i64>().map_err(|_| ValidationError::InvalidValue {
            field: "_id".to_string(),
            reason: format!("'{}' is not a numeric entry id", self.id),
        })?;

        Ok(TaxRateCacheEntry {
            entry_id: EntryId(entry_id),
            cache_id: self.cache_id,
            record_number: self.record_number,
            country: self.country,
            state_province: self.state_province,
            county: self.county,
            postal_code: self.postal_code,
            rate: self.rate,
            source_server: self.source_server,
        })
    }
}

impl From<&TaxRateCacheEntry> for TaxRateCacheDocument {
    fn from(entry: &TaxRateCacheEntry) -> Self {
        Self {
            id: entry.entry_id.to_string(),
            rev: None,
            cache_id: entry.cache_id,
            record_number: entry.record_number,
            country: entry.country.clone(),
            state_province: entry.state_province.clone(),
            county: entry.county.clone(),
            postal_code: entry.postal_code.clone(),
            rate: entry.rate,
            source_server: entry.source_server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityIdType, StateProvinceRef};

    fn make_entry() -> TaxRateCacheEntry {
        TaxRateCacheEntry {
            entry_id: EntryId(17),
            cache_id: CacheId::now_v7(),
            record_number: 4,
            country: Country::default(),
            state_province: StateProvince::default(),
            county: County::default(),
            postal_code: PostalCode::default(),
            rate: 8.25,
            source_server: SourceServerId::now_v7(),
        }
    }

    #[test]
    fn test_warehouse_slots_mut_reaches_every_slot() {
        let mut entry = make_entry();
        let warehouse = Warehouse::new(3, "CENTRAL", "Central");
        for slot in entry.warehouse_slots_mut() {
            *slot = Some(warehouse.clone());
        }
        assert!(entry
            .warehouse_slots()
            .iter()
            .all(|slot| *slot == Some(&warehouse)));
    }

    #[test]
    fn test_assign_state_province_updates_all_copies() {
        let mut entry = make_entry();
        entry.state_province.warehouse = Some(Warehouse::new(2, "W2", ""));
        let state = StateProvince {
            id: 48,
            name: "Texas".to_string(),
            abbreviation: "TX".to_string(),
            ..Default::default()
        };
        entry.assign_state_province(&state);

        let expected = StateProvinceRef {
            id: 48,
            name: "Texas".to_string(),
            abbreviation: "TX".to_string(),
        };
        assert_eq!(entry.state_province.to_ref(), expected);
        assert_eq!(entry.county.state_province, expected);
        assert_eq!(entry.postal_code.state_province, expected);
        assert_eq!(entry.state_province.warehouse.as_ref().map(|w| w.id), Some(2));
    }

    #[test]
    fn test_document_round_trip() {
        let entry = make_entry();
        let document = TaxRateCacheDocument::from(&entry);
        assert_eq!(document.id, "17");
        assert!(document.rev.is_none());

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["_id"], "17");
        assert!(json.get("_rev").is_none());

        let back = document.into_entry().unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_document_with_non_numeric_id_rejected() {
        let mut document = TaxRateCacheDocument::from(&make_entry());
        document.id = "design-doc".to_string();
        assert!(document.into_entry().is_err());
    }
}
