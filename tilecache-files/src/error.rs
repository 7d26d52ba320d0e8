//! Error types for tilecache-files.

use std::path::PathBuf;

use thiserror::Error;

use tilecache_core::{StoreError, TileKey};

/// Errors that stop an import or export.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("tile store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk tile tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{layer}: tile {key} has unreadable updatedAt {value:?}: {source}")]
    Timestamp {
        layer: String,
        key: TileKey,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Why an import left a file out. Skips are logged and counted, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Payload too short or not a JPEG/PNG.
    InvalidPayload,
    /// Path is not `zoom/x/y.<ext>`, or the coordinates do not fit the zoom.
    InvalidPath,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidPayload => write!(f, "invalid tile payload"),
            SkipReason::InvalidPath => write!(f, "not a zoom/x/y tile path"),
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TransferError {
    TransferError::Io {
        path: path.into(),
        source,
    }
}
