//! TAXSYNC Repair - Referential Repair Pipeline
//!
//! Backfills incomplete geography and warehouse references in cache entries
//! from caller-supplied dimension snapshots. Each dimension has one pass:
//!
//! 1. Partition the batch into entries that need the pass and entries that
//!    do not.
//! 2. Resolve a replacement for every entry that needs it, in parallel and
//!    independently of other entries.
//! 3. Write the replacement into every embedded copy of that dimension.
//! 4. Recombine; the output batch always has the input's size.
//!
//! Faults are recorded per entry. A faulted or cancelled entry is carried
//! through unchanged instead of discarding the whole batch.

pub mod fanout;
pub mod lookup;
pub mod passes;
pub mod pipeline;
pub mod predicates;
pub mod report;

pub use fanout::{fan_out, CancellationFlag, Outcome};
pub use lookup::{Keyed, LookupIndex};
pub use passes::{
    run_pass, CountryPass, CountyPass, FixupPass, PostalCodePass, StateProvincePass,
    WarehousePass,
};
pub use pipeline::{RepairDefaults, RepairPipeline};
pub use predicates::{
    needs_country_fixup, needs_county_fixup, needs_postal_code_fixup,
    needs_state_province_fixup, needs_warehouse_fixup,
};
pub use report::{
    assign_record_numbers, sort_by_record_number, EntryFault, PassReport, PassSummary,
    PipelineReport,
};
