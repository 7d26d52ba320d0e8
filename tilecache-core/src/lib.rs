//! tilecache core library: domain types, run configuration, tile stores.
//!
//! - [`types`]: tile keys, records, layer names, merge policies
//! - [`config`]: immutable run configuration and the flag grammar
//! - [`store`]: SQLite tile stores and per-layer transactions
//! - [`error`]: [`StoreError`], [`UsageError`]

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{LayerJob, SyncConfig, TransferConfig, TransferJob};
pub use error::{StoreError, UsageError};
pub use store::{
    Access, Fetch, JoinedRow, Layer, LayerMode, Schema, StoreTxn, SyncStores, TileStore,
};
pub use types::{LayerName, MergePolicy, TileKey, TileRecord, UpdatedAt};
