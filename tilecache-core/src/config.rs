//! Run configuration.
//!
//! Built once, from the flag grammar below or from a YAML run file, and then
//! passed by reference. Nothing here is mutated after construction.
//!
//! ```text
//! sync:   -src src.db -dst dst.db {[-updateOnly | -noUpdateOnly] -dir layer}
//! import: -db cache.db {[-flipY | -noFlipY] -dir dir}
//! export: -db cache.db {[-flipY | -noFlipY] -dir dir}
//! ```
//!
//! Mode toggles are sticky: each `-dir` takes the mode in force when it is read.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::UsageError;
use crate::types::{LayerName, MergePolicy};

/// Usage line for the sync grammar.
pub const SYNC_USAGE: &str = "-src src.db -dst dst.db {[-updateOnly | -noUpdateOnly] -dir dir}\n\
     \t-updateOnly: update existing tiles only, do not add new";

/// Usage line for the import/export grammar.
pub const TRANSFER_USAGE: &str = "-db cache.db {[-flipY | -noFlipY] -dir dir}\n\
     \t-flipY: convert between top-down and bottom-up row numbering";

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// One `(layer, policy)` pair of a synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerJob {
    pub layer: LayerName,
    #[serde(default)]
    pub policy: MergePolicy,
}

/// Everything a synchronization run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    #[serde(default)]
    pub layers: Vec<LayerJob>,
}

impl SyncConfig {
    /// Parse the sync flag grammar.
    pub fn from_args<I, S>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let mut source = None;
        let mut destination = None;
        let mut policy = MergePolicy::Full;
        let mut layers = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-updateOnly" => policy = MergePolicy::UpdateOnly,
                "-noUpdateOnly" => policy = MergePolicy::Full,
                "-src" => set_once(&mut source, "-src", value(&mut args, &arg)?)?,
                "-dst" => set_once(&mut destination, "-dst", value(&mut args, &arg)?)?,
                "-dir" => layers.push(LayerJob {
                    layer: layer_name(value(&mut args, &arg)?)?,
                    policy,
                }),
                _ => return Err(UsageError::Unrecognized(arg)),
            }
        }

        Ok(Self {
            source: source.ok_or(UsageError::Missing("-src"))?.into(),
            destination: destination.ok_or(UsageError::Missing("-dst"))?.into(),
            layers,
        })
    }

    /// Load a YAML run file.
    pub fn load_at(path: &Path) -> Result<Self, UsageError> {
        let contents = std::fs::read_to_string(path).map_err(|source| UsageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| UsageError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

/// One directory of an import or export run. The directory path doubles as
/// the layer name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub layer: LayerName,
    pub flip_y: bool,
}

impl TransferJob {
    /// Tile tree location for this layer.
    pub fn dir(&self) -> PathBuf {
        PathBuf::from(self.layer.as_str())
    }
}

/// Everything an import or export run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub database: PathBuf,
    pub dirs: Vec<TransferJob>,
}

impl TransferConfig {
    /// Parse the import/export flag grammar.
    pub fn from_args<I, S>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::into);
        let mut database = None;
        let mut flip_y = false;
        let mut dirs = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-flipY" => flip_y = true,
                "-noFlipY" => flip_y = false,
                "-db" => set_once(&mut database, "-db", value(&mut args, &arg)?)?,
                "-dir" => dirs.push(TransferJob {
                    layer: layer_name(value(&mut args, &arg)?)?,
                    flip_y,
                }),
                _ => return Err(UsageError::Unrecognized(arg)),
            }
        }

        Ok(Self {
            database: database.ok_or(UsageError::Missing("-db"))?.into(),
            dirs,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, UsageError> {
    args.next()
        .ok_or_else(|| UsageError::MissingValue(flag.to_string()))
}

fn set_once(
    slot: &mut Option<String>,
    flag: &'static str,
    value: String,
) -> Result<(), UsageError> {
    if slot.is_some() {
        return Err(UsageError::Repeated(flag));
    }
    *slot = Some(value);
    Ok(())
}

fn layer_name(raw: String) -> Result<LayerName, UsageError> {
    LayerName::new(raw).map_err(UsageError::Layer)
}
