//! Merge executor: copies planned tiles into the destination layer.
//!
//! ## Per-entry protocol
//!
//! 1. Re-fetch the source record by key (the plan only carries timestamps).
//! 2. Anything but exactly one row is a consistency fault; stop the layer.
//! 3. Upsert the full record into the destination layer.
//! 4. Advance progress.
//!
//! Nothing here commits. The caller commits the layer's transaction once
//! [`apply_plan`] returns `Ok`, so a fault leaves the layer untouched.

use tilecache_core::{Fetch, StoreTxn};

use crate::diff::MergePlan;
use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Integer-percentage progress over a fixed number of items.
///
/// A value is emitted only when the integer percentage differs from the last
/// one emitted, starting from 0, so the emitted sequence is strictly
/// increasing and never includes 0. An empty plan emits nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressTracker {
    total: usize,
    done: usize,
    last: u8,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: 0,
            last: 0,
        }
    }

    /// Record one processed item. Returns the new percentage if it changed.
    pub fn advance(&mut self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        self.done = (self.done + 1).min(self.total);
        let percent = (self.done * 100 / self.total) as u8;
        if percent == self.last {
            return None;
        }
        self.last = percent;
        Some(percent)
    }

    pub fn done(&self) -> usize {
        self.done
    }
}

// ---------------------------------------------------------------------------
// apply_plan
// ---------------------------------------------------------------------------

/// Outcome of applying one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub copied: usize,
}

/// Apply `plan` inside `txn`, calling `on_progress` with each new percentage.
///
/// A plan built by [`crate::plan_layer`] in the same transaction only names
/// keys the source holds, so a missing source record means the plan came from
/// another snapshot of the store.
pub fn apply_plan<F>(
    txn: &StoreTxn<'_>,
    plan: &MergePlan,
    mut on_progress: F,
) -> Result<MergeOutcome, SyncError>
where
    F: FnMut(u8),
{
    let layer = plan.layer();
    if plan.is_empty() {
        tracing::debug!("{layer}: nothing to copy");
        return Ok(MergeOutcome { copied: 0 });
    }

    tracing::info!("{layer}: performing inserts, please wait...");
    let mut progress = ProgressTracker::new(plan.len());

    for entry in plan.entries() {
        let record = match txn.get(plan.source(), entry.key)? {
            Fetch::One(record) => record,
            Fetch::Missing => {
                return Err(SyncError::Consistency {
                    layer: layer.to_string(),
                    key: entry.key,
                    rows: 0,
                })
            }
            Fetch::Duplicate(rows) => {
                return Err(SyncError::Consistency {
                    layer: layer.to_string(),
                    key: entry.key,
                    rows,
                })
            }
        };

        txn.upsert(plan.destination(), &record)?;

        if let Some(percent) = progress.advance() {
            tracing::debug!("{layer}: {percent}% of inserts done");
            on_progress(percent);
        }
    }

    Ok(MergeOutcome {
        copied: progress.done(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
