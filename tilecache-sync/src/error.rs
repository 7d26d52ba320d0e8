//! Error types for tilecache-sync.

use thiserror::Error;

use tilecache_core::{StoreError, TileKey};

/// All errors that can arise from synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the tile store.
    #[error("tile store error: {0}")]
    Store(#[from] StoreError),

    /// A layer the policy needs is absent. No plan was built.
    #[error("{layer}: layer is missing from the {store} store")]
    Schema { layer: String, store: String },

    /// The source returned other than exactly one record for a planned key.
    /// The layer was not committed.
    #[error("{layer}: expected exactly one source record for tile {key}, found {rows}")]
    Consistency {
        layer: String,
        key: TileKey,
        rows: usize,
    },
}

impl SyncError {
    /// Whether the fault means the stores are inconsistent rather than
    /// unreachable.
    pub fn is_fault(&self) -> bool {
        matches!(self, SyncError::Schema { .. } | SyncError::Consistency { .. })
    }
}

/// Map a missing-layer store error to [`SyncError::Schema`].
pub(crate) fn schema_err(err: StoreError) -> SyncError {
    match err {
        StoreError::MissingLayer { schema, layer } => SyncError::Schema {
            layer,
            store: schema,
        },
        other => SyncError::Store(other),
    }
}
