//! Bounded data-parallel fan-out over a slice of entries.
//!
//! Workers run on scoped threads and claim entries through a shared cursor.
//! Each worker keeps `(index, result)` pairs locally; the caller's slot
//! vector is filled by index after all workers join, so output order never
//! depends on scheduling.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use taxsync_core::RepairError;

/// Cooperative cancellation shared between a pipeline and its caller.
///
/// Cancelling stops workers from claiming new entries; entries already being
/// repaired finish normally.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a cancellation so the next run starts fresh.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What happened to one input item.
#[derive(Debug)]
pub enum Outcome<T> {
    Done(Result<T, RepairError>),
    /// Cancellation was observed before the item was claimed.
    NotStarted,
}

/// Apply `work` to every item on up to `workers` threads.
///
/// The returned vector is index-aligned with `items`. A panic inside `work`
/// is caught and reported as [`RepairError::WorkerPanicked`] for that item
/// alone.
pub fn fan_out<I, T, F>(
    items: &[I],
    workers: usize,
    cancel: &CancellationFlag,
    work: F,
) -> Vec<Outcome<T>>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> Result<T, RepairError> + Sync,
{
    let len = items.len();
    if len == 0 {
        return Vec::new();
    }

    let workers = workers.clamp(1, len);
    let cursor = AtomicUsize::new(0);

    let shard_outputs: Vec<Option<Vec<(usize, Result<T, RepairError>)>>> =
        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                let cursor = &cursor;
                let work = &work;
                handles.push(scope.spawn(move || {
                    let mut local = Vec::new();
                    loop {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let index = cursor.fetch_add(1, Ordering::SeqCst);
                        if index >= len {
                            break;
                        }
                        let result = catch_unwind(AssertUnwindSafe(|| work(&items[index])))
                            .unwrap_or_else(|payload| {
                                Err(RepairError::WorkerPanicked {
                                    reason: panic_message(payload.as_ref()),
                                })
                            });
                        local.push((index, result));
                    }
                    local
                }));
            }

            handles.into_iter().map(|h| h.join().ok()).collect()
        });

    let mut slots: Vec<Option<Result<T, RepairError>>> = (0..len).map(|_| None).collect();
    for (index, result) in shard_outputs.into_iter().flatten().flatten() {
        slots[index] = Some(result);
    }

    // Claims past `len` are never processed, so the cursor also bounds what
    // was started.
    let claimed = cursor.load(Ordering::SeqCst).min(len);
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Some(result) => Outcome::Done(result),
            None if index < claimed => Outcome::Done(Err(RepairError::WorkerPanicked {
                reason: "worker thread exited before reporting".to_string(),
            })),
            None => Outcome::NotStarted,
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
