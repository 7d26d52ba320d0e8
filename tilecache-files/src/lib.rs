//! # tilecache-files
//!
//! Moves tile layers between directory trees (`zoom/x/y.png`) and tile
//! stores. [`import`] and [`export`] run a whole [`tilecache_core::TransferConfig`];
//! [`import_dir`] and [`export_layer`] work on one layer of an open store.

pub mod error;
pub mod export;
pub mod import;

pub use error::{SkipReason, TransferError};
pub use export::{export, export_layer, tile_path, ExportReport};
pub use import::{import, import_dir, is_tile_payload, ImportReport};
