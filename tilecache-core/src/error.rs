//! Error types for tilecache-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from tile store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O failure, with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store opened read-only does not exist on disk.
    #[error("tile store not found at {path}")]
    NotFound { path: PathBuf },

    /// Source and destination resolve to the same file.
    #[error("source and destination are the same tile store: {path}")]
    SameStore { path: PathBuf },

    /// Store paths are handed to SQLite as URIs, which must be UTF-8.
    #[error("tile store path is not valid UTF-8: {path}")]
    NonUtf8Path { path: PathBuf },

    /// A layer opened for reading has no table in the given schema.
    #[error("layer '{layer}' does not exist in the {schema} store")]
    MissingLayer { schema: String, layer: String },

    /// A write was attempted against a read-only schema.
    #[error("layer '{layer}' is read-only in the {schema} store")]
    ReadOnly { schema: String, layer: String },

    /// Layer name cannot be used as an identifier.
    #[error("invalid layer name {name:?}: {reason}")]
    InvalidLayerName { name: String, reason: &'static str },
}

/// Errors produced while reading command-line arguments or a run file.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("missing required argument {0}")]
    Missing(&'static str),

    #[error("{0} given more than once")]
    Repeated(&'static str),

    #[error("{0} expects a value")]
    MissingValue(String),

    #[error("invalid parameter: {0}")]
    Unrecognized(String),

    #[error("invalid layer name: {0}")]
    Layer(#[source] StoreError),

    #[error("failed to read run file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse run file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
