//! Snapshot lookup indexes.
//!
//! A record resolves by numeric id first and by normalized code second. Ids
//! of zero and blank codes never take part in matching.

use std::collections::HashMap;
use taxsync_core::{
    normalize_code, Country, County, CountyRef, PostalCode, StateProvince, StateProvinceRef,
    Warehouse,
};

/// Matching keys of a reference record or of an embedded copy.
pub trait Keyed {
    fn key_id(&self) -> i64;

    /// Code-like fields, in matching priority order.
    fn key_codes(&self) -> Vec<&str>;
}

impl Keyed for Warehouse {
    fn key_id(&self) -> i64 {
        self.id
    }

    fn key_codes(&self) -> Vec<&str> {
        vec![self.code.as_str()]
    }
}

impl Keyed for Country {
    fn key_id(&self) -> i64 {
        self.id
    }

    fn key_codes(&self) -> Vec<&str> {
        vec![self.code.as_str(), self.iso2.as_str(), self.iso3.as_str()]
    }
}

impl Keyed for StateProvince {
    fn key_id(&self) -> i64 {
        self.id
    }

    fn key_codes(&self) -> Vec<&str> {
        vec![self.abbreviation.as_str(), self.name.as_str()]
    }
}

impl Keyed for StateProvinceRef {
    fn key_id(&self) -> i64 {
        self.id
    }

    fn key_codes(&self) -> Vec<&str> {
        vec![self.abbreviation.as_str(), self.name.as_str()]
    }
}

impl Keyed for County {
    fn key_id(&self) -> i64 {
        self.id
    }

    fn key_codes(&self) -> Vec<&str> {
        vec![self.code.as_str(), self.name.as_str()]
    }
}

impl Keyed for CountyRef {
    fn key_id(&self) -> i64 {
        self.id
    }

    fn key_codes(&self) -> Vec<&str> {
        vec![self.code.as_str(), self.name.as_str()]
    }
}

impl Keyed for PostalCode {
    fn key_id(&self) -> i64 {
        self.id
    }

    fn key_codes(&self) -> Vec<&str> {
        vec![self.value.as_str()]
    }
}

/// Id and code index over one snapshot catalog.
///
/// When two records share an id or code, the first one in catalog order wins.
#[derive(Debug)]
pub struct LookupIndex<'a, T> {
    by_id: HashMap<i64, &'a T>,
    by_code: HashMap<String, &'a T>,
}

impl<'a, T: Keyed> LookupIndex<'a, T> {
    pub fn build(records: &'a [T]) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut by_code = HashMap::with_capacity(records.len());

        for record in records {
            let id = record.key_id();
            if id != 0 {
                by_id.entry(id).or_insert(record);
            }
            for code in record.key_codes() {
                if let Some(normalized) = normalize_code(code) {
                    by_code.entry(normalized).or_insert(record);
                }
            }
        }

        Self { by_id, by_code }
    }

    pub fn by_id(&self, id: i64) -> Option<&'a T> {
        if id == 0 {
            return None;
        }
        self.by_id.get(&id).copied()
    }

    pub fn by_code(&self, code: &str) -> Option<&'a T> {
        normalize_code(code).and_then(|c| self.by_code.get(&c).copied())
    }

    /// Resolve the first candidate that matches.
    ///
    /// Every candidate is tried by id before any candidate is tried by code,
    /// so a numbered copy further down the list beats a coded copy ahead of it.
    pub fn resolve(&self, candidates: &[&dyn Keyed]) -> Option<&'a T> {
        candidates
            .iter()
            .find_map(|c| self.by_id(c.key_id()))
            .or_else(|| {
                candidates
                    .iter()
                    .find_map(|c| c.key_codes().into_iter().find_map(|code| self.by_code(code)))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty() && self.by_code.is_empty()
    }
}
