//! Synchronization run: plan, merge and commit each requested layer in order.
//!
//! ```text
//! Idle -> Opened -> {Planning(layer) -> Merging(layer) -> Committed(layer)}* -> Closed
//!                         any fault -> Aborted
//! ```
//!
//! Each layer runs in its own transaction. A fault stops the run; layers
//! committed before it stay committed, so re-running converges.

use std::fmt;

use tilecache_core::{LayerJob, LayerName, MergePolicy, SyncConfig, SyncStores};

use crate::diff::{plan_layer, MergePlan};
use crate::error::SyncError;
use crate::writer::apply_plan;

/// Position of a run in its state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Opened,
    Planning(LayerName),
    Merging(LayerName),
    Committed(LayerName),
    Closed,
    Aborted,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Opened => write!(f, "stores opened"),
            RunPhase::Planning(layer) => write!(f, "{layer}: planning"),
            RunPhase::Merging(layer) => write!(f, "{layer}: merging"),
            RunPhase::Committed(layer) => write!(f, "{layer}: committed"),
            RunPhase::Closed => write!(f, "stores closed"),
            RunPhase::Aborted => write!(f, "aborted"),
        }
    }
}

/// Receives run events. Every method defaults to doing nothing.
pub trait SyncObserver {
    fn phase(&mut self, _phase: &RunPhase) {}

    fn planned(&mut self, _plan: &MergePlan) {}

    fn progress(&mut self, _layer: &LayerName, _percent: u8) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Result of one committed layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    pub layer: LayerName,
    pub policy: MergePolicy,
    pub planned: usize,
    pub new_tiles: usize,
    pub copied: usize,
}

/// Result of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub layers: Vec<LayerReport>,
}

impl RunReport {
    pub fn copied(&self) -> usize {
        self.layers.iter().map(|l| l.copied).sum()
    }
}

/// Run every job of `config` against one source/destination pair.
///
/// The first failing layer aborts the run and its error is returned; the
/// stores are closed either way.
pub fn run(config: &SyncConfig, observer: &mut dyn SyncObserver) -> Result<RunReport, SyncError> {
    observer.phase(&RunPhase::Idle);
    let mut stores = match SyncStores::open(&config.source, &config.destination) {
        Ok(stores) => stores,
        Err(err) => {
            observer.phase(&RunPhase::Aborted);
            return Err(err.into());
        }
    };
    tracing::info!(
        "synchronizing {} -> {}",
        stores.source_path().display(),
        stores.destination_path().display()
    );
    observer.phase(&RunPhase::Opened);

    let mut report = RunReport::default();
    for job in &config.layers {
        match sync_layer(&mut stores, job, observer) {
            Ok(layer) => report.layers.push(layer),
            Err(err) => {
                tracing::error!("{}: aborting run: {err}", job.layer);
                observer.phase(&RunPhase::Aborted);
                if let Err(close_err) = stores.close() {
                    tracing::warn!("failed to close stores after abort: {close_err}");
                }
                return Err(err);
            }
        }
    }

    stores.close()?;
    observer.phase(&RunPhase::Closed);
    Ok(report)
}

/// Plan, merge and commit one layer.
///
/// On error the layer's transaction is dropped and nothing it wrote persists.
pub fn sync_layer(
    stores: &mut SyncStores,
    job: &LayerJob,
    observer: &mut dyn SyncObserver,
) -> Result<LayerReport, SyncError> {
    let txn = stores.transaction()?;

    observer.phase(&RunPhase::Planning(job.layer.clone()));
    let plan = plan_layer(&txn, &job.layer, job.policy)?;
    observer.planned(&plan);

    observer.phase(&RunPhase::Merging(job.layer.clone()));
    let outcome = apply_plan(&txn, &plan, |percent| {
        observer.progress(&job.layer, percent)
    })?;

    tracing::info!("{}: performing commit, please wait...", job.layer);
    txn.commit()?;
    observer.phase(&RunPhase::Committed(job.layer.clone()));

    Ok(LayerReport {
        layer: job.layer.clone(),
        policy: job.policy,
        planned: plan.len(),
        new_tiles: plan.new_tiles(),
        copied: outcome.copied,
    })
}
