//! The five fixup passes and the shared pass driver.

mod country;
mod county;
mod postal_code;
mod state_province;
mod warehouse;

pub use country::CountryPass;
pub use county::CountyPass;
pub use postal_code::PostalCodePass;
pub use state_province::StateProvincePass;
pub use warehouse::WarehousePass;

use crate::fanout::{fan_out, CancellationFlag, Outcome};
use crate::report::{EntryFault, PassReport};
use taxsync_core::{Dimension, RecordNumber, RepairError, TaxRateCacheEntry};

/// One dimension's repair step.
///
/// `repair` sees one entry at a time and must not depend on any other entry
/// of the batch.
pub trait FixupPass: Sync {
    fn dimension(&self) -> Dimension;

    /// Whether the entry has an incomplete reference at this dimension.
    fn needs_fixup(&self, entry: &TaxRateCacheEntry) -> bool;

    /// Produce the repaired entry.
    fn repair(&self, entry: &TaxRateCacheEntry) -> Result<TaxRateCacheEntry, RepairError>;
}

pub(crate) fn unresolved(
    dimension: Dimension,
    record_number: RecordNumber,
    reason: &str,
) -> RepairError {
    RepairError::Unresolved {
        dimension,
        record_number,
        reason: reason.to_string(),
    }
}

/// Partition, repair in parallel, and recombine.
pub fn run_pass<P: FixupPass + ?Sized>(
    pass: &P,
    entries: Vec<TaxRateCacheEntry>,
    workers: usize,
    cancel: &CancellationFlag,
) -> PassReport {
    let dimension = pass.dimension();
    let total = entries.len();

    let (filtered, good): (Vec<_>, Vec<_>) =
        entries.into_iter().partition(|e| pass.needs_fixup(e));

    tracing::info!(
        dimension = %dimension,
        total,
        filtered = filtered.len(),
        good = good.len(),
        workers,
        "Starting fixup pass"
    );

    let outcomes = fan_out(&filtered, workers, cancel, |entry| pass.repair(entry));

    let mut report = PassReport::empty(dimension);
    report.good = good.len();
    report.entries.reserve(total);
    report.entries.extend(good);

    for (original, outcome) in filtered.into_iter().zip(outcomes) {
        match outcome {
            Outcome::Done(Ok(repaired)) => {
                if repaired != original {
                    report.fixed += 1;
                }
                tracing::trace!(
                    dimension = %dimension,
                    record_number = repaired.record_number,
                    "Repaired entry"
                );
                report.entries.push(repaired);
            }
            Outcome::Done(Err(error)) => {
                tracing::warn!(
                    dimension = %dimension,
                    record_number = original.record_number,
                    error = %error,
                    "Entry left unrepaired"
                );
                report.faults.push(EntryFault {
                    dimension,
                    record_number: original.record_number,
                    error,
                });
                report.entries.push(original);
            }
            Outcome::NotStarted => {
                report.cancelled += 1;
                report.entries.push(original);
            }
        }
    }

    if report.cancelled > 0 {
        tracing::warn!(
            dimension = %dimension,
            cancelled = report.cancelled,
            "Fixup pass cancelled before every entry was processed"
        );
    }

    tracing::info!(
        dimension = %dimension,
        fixed = report.fixed,
        faults = report.faults.len(),
        cancelled = report.cancelled,
        "Finished fixup pass"
    );

    debug_assert_eq!(report.entries.len(), total);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxsync_core::{CacheId, EntityIdType};
    use taxsync_test_utils::fixtures;

    /// Marks every odd record and panics on record 3.
    struct FlakyPass;

    impl FixupPass for FlakyPass {
        fn dimension(&self) -> Dimension {
            Dimension::PostalCode
        }

        fn needs_fixup(&self, entry: &TaxRateCacheEntry) -> bool {
            entry.record_number % 2 == 1
        }

        fn repair(&self, entry: &TaxRateCacheEntry) -> Result<TaxRateCacheEntry, RepairError> {
            if entry.record_number == 3 {
                panic!("corrupt record");
            }
            let mut repaired = entry.clone();
            repaired.rate += 1.0;
            Ok(repaired)
        }
    }

    #[test]
    fn test_good_then_filtered_in_input_order() {
        let batch = fixtures::complete_batch(CacheId::now_v7(), 6);
        let report = run_pass(&FlakyPass, batch, 3, &CancellationFlag::new());

        let numbers: Vec<_> = report.entries.iter().map(|e| e.record_number).collect();
        assert_eq!(numbers, vec![0, 2, 4, 1, 3, 5]);
        assert_eq!(report.good, 3);
        assert_eq!(report.fixed, 2);
    }

    #[test]
    fn test_panicking_entry_passes_through() {
        let batch = fixtures::complete_batch(CacheId::now_v7(), 6);
        let report = run_pass(&FlakyPass, batch, 2, &CancellationFlag::new());

        assert_eq!(report.len(), 6);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].record_number, 3);
        assert!(!report.is_clean());

        let record_3 = report
            .entries
            .iter()
            .find(|e| e.record_number == 3)
            .unwrap();
        assert_eq!(record_3.rate, 8.25);
    }

    #[test]
    fn test_cancelled_pass_keeps_every_entry() {
        let batch = fixtures::complete_batch(CacheId::now_v7(), 6);
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let report = run_pass(&FlakyPass, batch.clone(), 2, &cancel);
        assert_eq!(report.cancelled, 3);
        assert_eq!(report.fixed, 0);
        assert_eq!(report.into_sorted().entries, batch);
    }
}
