//! Read-only dimension catalogs used as join sources during repair.

use crate::{Country, County, PostalCode, StateProvince, Warehouse};
use serde::{Deserialize, Serialize};

/// Immutable reference data for one repair run.
///
/// Snapshots are supplied by the caller (usually through a loader) and are
/// shared read-only across repair workers. Nothing in the pipeline mutates
/// them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionSnapshot {
    pub countries: Vec<Country>,
    pub state_provinces: Vec<StateProvince>,
    pub counties: Vec<County>,
    pub postal_codes: Vec<PostalCode>,
    pub warehouses: Vec<Warehouse>,
}

impl DimensionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_countries(mut self, countries: Vec<Country>) -> Self {
        self.countries = countries;
        self
    }

    pub fn with_state_provinces(mut self, state_provinces: Vec<StateProvince>) -> Self {
        self.state_provinces = state_provinces;
        self
    }

    pub fn with_counties(mut self, counties: Vec<County>) -> Self {
        self.counties = counties;
        self
    }

    pub fn with_postal_codes(mut self, postal_codes: Vec<PostalCode>) -> Self {
        self.postal_codes = postal_codes;
        self
    }

    pub fn with_warehouses(mut self, warehouses: Vec<Warehouse>) -> Self {
        self.warehouses = warehouses;
        self
    }

    /// Total number of reference records across all catalogs.
    pub fn len(&self) -> usize {
        self.countries.len()
            + self.state_provinces.len()
            + self.counties.len()
            + self.postal_codes.len()
            + self.warehouses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
