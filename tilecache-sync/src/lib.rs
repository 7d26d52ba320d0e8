//! # tilecache-sync
//!
//! Reconciles tile layers from a source store into a destination store.
//!
//! Call [`run`] with a [`tilecache_core::SyncConfig`] to process every
//! requested layer, or drive [`plan_layer`] and [`apply_plan`] directly inside
//! a [`tilecache_core::StoreTxn`] for a single layer.

pub mod diff;
pub mod error;
pub mod pipeline;
pub mod writer;

#[cfg(test)]
mod fixtures;

pub use diff::{plan_layer, MergePlan, PlanEntry};
pub use error::SyncError;
pub use pipeline::{
    run, sync_layer, LayerReport, NoopObserver, RunPhase, RunReport, SyncObserver,
};
pub use writer::{apply_plan, MergeOutcome, ProgressTracker};
