//! Repair pipeline: configured entry point for the five passes.

use crate::fanout::CancellationFlag;
use crate::passes::{
    run_pass, CountryPass, CountyPass, FixupPass, PostalCodePass, StateProvincePass,
    WarehousePass,
};
use crate::report::{PassReport, PipelineReport};
use taxsync_core::{
    optimal_worker_count, Country, DimensionSnapshot, SyncConfig, TaxRateCacheEntry, Warehouse,
};

/// Fallback records for the passes that never leave an entry unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairDefaults {
    pub warehouse: Warehouse,
    pub country: Country,
}

/// Runs fixup passes over in-memory batches.
///
/// Passes are independent: each can be invoked on its own, and `run_all`
/// chains them in dimension order. Nothing is persisted here.
#[derive(Debug, Clone)]
pub struct RepairPipeline {
    workers: usize,
    cancel: CancellationFlag,
}

impl Default for RepairPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RepairPipeline {
    /// One worker per available core.
    pub fn new() -> Self {
        Self {
            workers: optimal_worker_count(),
            cancel: CancellationFlag::new(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new().with_workers(config.effective_worker_count())
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Handle for cancelling runs of this pipeline from another thread.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn run_pass<P: FixupPass + ?Sized>(
        &self,
        pass: &P,
        entries: Vec<TaxRateCacheEntry>,
    ) -> PassReport {
        run_pass(pass, entries, self.workers, &self.cancel)
    }

    pub fn fix_up_missing_warehouses(
        &self,
        entries: Vec<TaxRateCacheEntry>,
        snapshot: &DimensionSnapshot,
        default: &Warehouse,
    ) -> PassReport {
        self.run_pass(&WarehousePass::new(&snapshot.warehouses, default), entries)
    }

    pub fn fix_up_missing_countries(
        &self,
        entries: Vec<TaxRateCacheEntry>,
        snapshot: &DimensionSnapshot,
        default: &Country,
    ) -> PassReport {
        self.run_pass(&CountryPass::new(&snapshot.countries, default), entries)
    }

    pub fn fix_up_missing_state_provinces(
        &self,
        entries: Vec<TaxRateCacheEntry>,
        snapshot: &DimensionSnapshot,
    ) -> PassReport {
        self.run_pass(&StateProvincePass::new(&snapshot.state_provinces), entries)
    }

    pub fn fix_up_missing_counties(
        &self,
        entries: Vec<TaxRateCacheEntry>,
        snapshot: &DimensionSnapshot,
    ) -> PassReport {
        self.run_pass(&CountyPass::new(&snapshot.counties), entries)
    }

    pub fn fix_up_missing_postal_codes(
        &self,
        entries: Vec<TaxRateCacheEntry>,
        snapshot: &DimensionSnapshot,
    ) -> PassReport {
        self.run_pass(&PostalCodePass::new(&snapshot.postal_codes), entries)
    }

    /// Run every pass in order Warehouse, Country, StateProvince, County,
    /// PostalCode. The final batch is sorted by record number.
    pub fn run_all(
        &self,
        entries: Vec<TaxRateCacheEntry>,
        snapshot: &DimensionSnapshot,
        defaults: &RepairDefaults,
    ) -> PipelineReport {
        let warehouse = WarehousePass::new(&snapshot.warehouses, &defaults.warehouse);
        let country = CountryPass::new(&snapshot.countries, &defaults.country);
        let state_province = StateProvincePass::new(&snapshot.state_provinces);
        let county = CountyPass::new(&snapshot.counties);
        let postal_code = PostalCodePass::new(&snapshot.postal_codes);
        let passes: [&dyn FixupPass; 5] =
            [&warehouse, &country, &state_province, &county, &postal_code];

        let mut current = entries;
        let mut summaries = Vec::with_capacity(passes.len());
        let mut faults = Vec::new();

        for pass in passes {
            let report = self.run_pass(pass, current);
            summaries.push(report.summary());
            faults.extend(report.faults.iter().cloned());
            current = report.into_sorted().into_entries();
        }

        let report = PipelineReport {
            entries: current,
            passes: summaries,
            faults,
        };

        tracing::info!(
            entries = report.entries.len(),
            fixed = report.total_fixed(),
            faults = report.faults.len(),
            cancelled = report.was_cancelled(),
            "Repair pipeline finished"
        );
        report
    }
}
