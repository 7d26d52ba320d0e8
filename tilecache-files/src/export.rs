//! Tile store to directory tree.
//!
//! Each record lands at `<root>/zoom/x/y.png` with its access and
//! modification times set to `updatedAt`. Files are written next to their
//! final path with a `.temp` suffix and renamed into place, so an interrupted
//! export never leaves a truncated tile that a later import would pick up.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filetime::FileTime;

use tilecache_core::{
    Access, LayerMode, LayerName, Schema, TileKey, TileRecord, TileStore, TransferConfig,
};

use crate::error::{io_err, TransferError};
use crate::import::TEMP_SUFFIX;

/// Counts for one exported layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub exported: usize,
    /// Records whose key cannot be flipped at their zoom.
    pub skipped: usize,
}

/// Export every directory of `config` from its database.
pub fn export(config: &TransferConfig) -> Result<Vec<(LayerName, ExportReport)>, TransferError> {
    let mut store = TileStore::open(&config.database, Access::ReadOnly)?;
    let mut reports = Vec::with_capacity(config.dirs.len());
    for job in &config.dirs {
        let report = export_layer(&mut store, &job.layer, &job.dir(), job.flip_y)?;
        reports.push((job.layer.clone(), report));
    }
    store.close()?;
    Ok(reports)
}

/// Write every record of `layer` under `root`.
pub fn export_layer(
    store: &mut TileStore,
    layer: &LayerName,
    root: &Path,
    flip_y: bool,
) -> Result<ExportReport, TransferError> {
    tracing::info!(
        "{layer}: exporting {} to {}",
        store.path().display(),
        root.display()
    );
    let txn = store.transaction()?;
    let source = txn.open_layer(Schema::Main, layer, LayerMode::Read)?;

    let mut report = ExportReport::default();
    txn.scan::<_, TransferError>(&source, |record| {
        let key = if flip_y {
            match record.key.flip_y() {
                Some(key) => key,
                None => {
                    tracing::warn!("{layer}: skipping {}: cannot flip at this zoom", record.key);
                    report.skipped += 1;
                    return Ok(());
                }
            }
        } else {
            record.key
        };
        write_tile(layer, root, key, &record)?;
        report.exported += 1;
        Ok(())
    })?;
    txn.rollback()?;

    tracing::info!("{layer}: exported {} tiles", report.exported);
    Ok(report)
}

/// `<root>/zoom/x/y.png`
pub fn tile_path(root: &Path, key: TileKey) -> PathBuf {
    root.join(key.zoom.to_string())
        .join(key.x.to_string())
        .join(format!("{}.png", key.y))
}

/// `path` with the temp suffix appended, keeping non-UTF-8 bytes intact.
fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(TEMP_SUFFIX);
    PathBuf::from(tmp)
}

fn write_tile(
    layer: &LayerName,
    root: &Path,
    key: TileKey,
    record: &TileRecord,
) -> Result<(), TransferError> {
    let modified: DateTime<Utc> =
        record
            .updated_at
            .to_datetime()
            .map_err(|source| TransferError::Timestamp {
                layer: layer.to_string(),
                key: record.key,
                value: record.updated_at.to_string(),
                source,
            })?;

    let path = tile_path(root, key);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = temp_path(&path);
    fs::write(&tmp, &record.payload).map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;

    let time = FileTime::from_unix_time(modified.timestamp(), 0);
    filetime::set_file_times(&path, time, time).map_err(|e| io_err(&path, e))?;
    tracing::debug!("{layer}: {} -> {}", record.key, path.display());
    Ok(())
}
