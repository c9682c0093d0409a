//! Pass and pipeline outcomes.

use taxsync_core::{Dimension, RecordNumber, RepairError, TaxRateCacheEntry};

/// A per-entry fault recorded by a pass. The entry itself was passed
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFault {
    pub dimension: Dimension,
    pub record_number: RecordNumber,
    pub error: RepairError,
}

impl EntryFault {
    /// Unresolved lookups are tolerated; anything else is a real failure.
    pub fn is_tolerated(&self) -> bool {
        self.error.is_unresolved()
    }
}

/// Result of one fixup pass.
///
/// `entries` always holds exactly as many entries as the pass received:
/// the untouched `good` entries first, then the `filtered` ones, each group
/// in input order.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub dimension: Dimension,
    pub entries: Vec<TaxRateCacheEntry>,
    pub faults: Vec<EntryFault>,
    /// Entries that did not need this pass.
    pub good: usize,
    /// Entries the pass changed.
    pub fixed: usize,
    /// Entries left unprocessed because the run was cancelled.
    pub cancelled: usize,
}

impl PassReport {
    pub fn empty(dimension: Dimension) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            faults: Vec::new(),
            good: 0,
            fixed: 0,
            cancelled: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that needed this pass.
    pub fn filtered(&self) -> usize {
        self.entries.len() - self.good
    }

    /// True when no fault other than a tolerated unresolved lookup occurred
    /// and nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.cancelled == 0 && self.faults.iter().all(EntryFault::is_tolerated)
    }

    /// Faults that are not tolerated unresolved lookups.
    pub fn hard_faults(&self) -> impl Iterator<Item = &EntryFault> {
        self.faults.iter().filter(|f| !f.is_tolerated())
    }

    /// Re-sort entries by record number.
    pub fn into_sorted(mut self) -> Self {
        sort_by_record_number(&mut self.entries);
        self
    }

    pub fn into_entries(self) -> Vec<TaxRateCacheEntry> {
        self.entries
    }

    pub fn summary(&self) -> PassSummary {
        PassSummary {
            dimension: self.dimension,
            filtered: self.filtered(),
            good: self.good,
            fixed: self.fixed,
            faults: self.faults.len(),
            cancelled: self.cancelled,
        }
    }
}

/// Counters of one pass, without the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub dimension: Dimension,
    pub filtered: usize,
    pub good: usize,
    pub fixed: usize,
    pub faults: usize,
    pub cancelled: usize,
}

/// Result of running every pass in sequence.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Final entries, ordered by record number.
    pub entries: Vec<TaxRateCacheEntry>,
    pub passes: Vec<PassSummary>,
    pub faults: Vec<EntryFault>,
}

impl PipelineReport {
    pub fn total_fixed(&self) -> usize {
        self.passes.iter().map(|p| p.fixed).sum()
    }

    pub fn was_cancelled(&self) -> bool {
        self.passes.iter().any(|p| p.cancelled > 0)
    }

    pub fn is_clean(&self) -> bool {
        !self.was_cancelled() && self.faults.iter().all(EntryFault::is_tolerated)
    }

    pub fn hard_faults(&self) -> impl Iterator<Item = &EntryFault> {
        self.faults.iter().filter(|f| !f.is_tolerated())
    }
}

/// Stable sort by record number.
pub fn sort_by_record_number(entries: &mut [TaxRateCacheEntry]) {
    entries.sort_by_key(|e| e.record_number);
}

/// Number a batch densely from 0 in input order when the source supplied no
/// record numbers (every entry carries 0). Returns whether it renumbered.
pub fn assign_record_numbers(entries: &mut [TaxRateCacheEntry]) -> bool {
    if entries.len() < 2 || entries.iter().any(|e| e.record_number != 0) {
        return false;
    }
    for (n, entry) in entries.iter_mut().enumerate() {
        entry.record_number = n as RecordNumber;
    }
    true
}
