//! Geography and warehouse reference records.
//!
//! Every geography level carries its own copy of each ancestor it refers to.
//! Any single copy may be incomplete (zero id, blank code) independently of
//! the others, so the types below never assume the copies agree.
//!
//! Slot inventory for one [`crate::TaxRateCacheEntry`]:
//!
//! | Dimension     | Embedded copies |
//! |---------------|-----------------|
//! | Warehouse     | 7: each level's own warehouse plus the warehouse of the Country embedded in StateProvince, County and PostalCode |
//! | Country       | 4: entry level, StateProvince, County, PostalCode |
//! | StateProvince | 3: entry level, County, PostalCode |
//! | County        | 2: entry level, PostalCode |
//! | PostalCode    | 1: entry level |

use serde::{Deserialize, Serialize};

/// Fulfilment warehouse referenced from every geography level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: i64,
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl Warehouse {
    pub fn new(id: i64, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Country record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub iso2: String,
    pub iso3: String,
    /// ISO 3166-1 numeric code, kept as text so leading zeros survive.
    pub iso_numeric: String,
    pub warehouse: Option<Warehouse>,
}

impl Country {
    /// Copy the identifying fields of `other`, keeping this copy's warehouse.
    pub fn assign_identity(&mut self, other: &Country) {
        self.id = other.id;
        self.code = other.code.clone();
        self.name = other.name.clone();
        self.iso2 = other.iso2.clone();
        self.iso3 = other.iso3.clone();
        self.iso_numeric = other.iso_numeric.clone();
    }

    /// Whether the identifying fields match `other`, ignoring the warehouse.
    pub fn same_identity(&self, other: &Country) -> bool {
        self.id == other.id
            && self.code == other.code
            && self.name == other.name
            && self.iso2 == other.iso2
            && self.iso3 == other.iso3
            && self.iso_numeric == other.iso_numeric
    }
}

/// Ancestor-free StateProvince copy embedded in County and PostalCode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProvinceRef {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
}

/// State or province record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProvince {
    pub id: i64,
    pub name: String,
    pub abbreviation: String,
    pub warehouse: Option<Warehouse>,
    pub country: Country,
}

impl StateProvince {
    pub fn to_ref(&self) -> StateProvinceRef {
        StateProvinceRef {
            id: self.id,
            name: self.name.clone(),
            abbreviation: self.abbreviation.clone(),
        }
    }

    /// Copy the identifying fields of `other`, keeping warehouse and country.
    pub fn assign_identity(&mut self, other: &StateProvince) {
        self.id = other.id;
        self.name = other.name.clone();
        self.abbreviation = other.abbreviation.clone();
    }
}

/// Ancestor-free County copy embedded in PostalCode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyRef {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// County record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct County {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub warehouse: Option<Warehouse>,
    pub state_province: StateProvinceRef,
    pub country: Country,
}

impl County {
    pub fn to_ref(&self) -> CountyRef {
        CountyRef {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
        }
    }

    /// Copy the identifying fields of `other`, keeping every ancestor copy.
    pub fn assign_identity(&mut self, other: &County) {
        self.id = other.id;
        self.code = other.code.clone();
        self.name = other.name.clone();
    }
}

/// Postal code record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalCode {
    pub id: i64,
    pub value: String,
    pub warehouse: Option<Warehouse>,
    pub county: CountyRef,
    pub state_province: StateProvinceRef,
    pub country: Country,
}

impl PostalCode {
    /// Copy the identifying fields of `other`, keeping every ancestor copy.
    pub fn assign_identity(&mut self, other: &PostalCode) {
        self.id = other.id;
        self.value = other.value.clone();
    }
}
