//! Merge planning: which tiles of a layer must be copied to the destination.
//!
//! A plan is a snapshot of one joined scan, taken inside the layer's
//! transaction. It is held in memory in full before any write happens, so very
//! large layers cost memory proportional to the number of stale tiles.

use tilecache_core::{
    Layer, LayerMode, LayerName, MergePolicy, Schema, StoreTxn, TileKey, UpdatedAt,
};

use crate::error::{schema_err, SyncError};

/// One tile selected for copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub key: TileKey,
    pub source_updated: UpdatedAt,
    /// `None` when the destination had no record for the key.
    pub destination_updated: Option<UpdatedAt>,
}

impl PlanEntry {
    /// The tile is absent from the destination.
    pub fn is_new(&self) -> bool {
        self.destination_updated.is_none()
    }
}

/// The ordered set of tiles to copy for one `(layer, policy)` pair.
#[derive(Debug, Clone)]
pub struct MergePlan {
    source: Layer,
    destination: Layer,
    policy: MergePolicy,
    entries: Vec<PlanEntry>,
    new_tiles: usize,
}

impl MergePlan {
    pub fn layer(&self) -> &LayerName {
        self.destination.name()
    }

    pub fn source(&self) -> &Layer {
        &self.source
    }

    pub fn destination(&self) -> &Layer {
        &self.destination
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose destination record was absent.
    pub fn new_tiles(&self) -> usize {
        self.new_tiles
    }

    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        self.entries.iter().map(|entry| entry.key)
    }
}

#[cfg(test)]
impl MergePlan {
    /// Same layers and policy, different entries.
    pub(crate) fn with_entries(mut self, entries: Vec<PlanEntry>) -> Self {
        self.new_tiles = entries.iter().filter(|e| e.is_new()).count();
        self.entries = entries;
        self
    }
}

/// Build the merge plan for `layer` under `policy`.
///
/// `Full` creates the destination layer when missing; `UpdateOnly` requires it
/// and fails with [`SyncError::Schema`] otherwise. A missing source layer is a
/// [`SyncError::Schema`] under both policies.
pub fn plan_layer(
    txn: &StoreTxn<'_>,
    layer: &LayerName,
    policy: MergePolicy,
) -> Result<MergePlan, SyncError> {
    let source = txn
        .open_layer(Schema::Source, layer, LayerMode::Read)
        .map_err(schema_err)?;
    let mode = match policy {
        MergePolicy::Full => LayerMode::Write,
        MergePolicy::UpdateOnly => LayerMode::Read,
    };
    let destination = txn
        .open_layer(Schema::Destination, layer, mode)
        .map_err(schema_err)?;

    tracing::info!("{layer}: performing select ({policy}), please wait...");

    let mut entries = Vec::new();
    let mut new_tiles = 0usize;
    txn.scan_joined(&source, &destination, policy, |row| {
        if row.destination_updated.is_none() {
            new_tiles += 1;
        }
        tracing::debug!(
            "{layer}: {}: {} -> {}",
            row.key,
            row.destination_updated
                .as_ref()
                .map_or("(none)", UpdatedAt::as_str),
            row.source_updated,
        );
        entries.push(PlanEntry {
            key: row.key,
            source_updated: row.source_updated,
            destination_updated: row.destination_updated,
        });
    })?;

    tracing::info!(
        "{layer}: total updates: {} (new: {new_tiles})",
        entries.len()
    );

    Ok(MergePlan {
        source,
        destination,
        policy,
        entries,
        new_tiles,
    })
}
