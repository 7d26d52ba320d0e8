//! Directory tree to tile store.
//!
//! A tree is laid out `zoom/x/y.<ext>`. Every accepted file becomes one record
//! whose `updatedAt` is the file's modification time in UTC, truncated to
//! seconds. The layer commits once, after the whole tree was walked.

use std::fs;
use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use tilecache_core::{
    Access, LayerMode, LayerName, Schema, TileKey, TileRecord, TileStore, TransferConfig,
    UpdatedAt,
};

use crate::error::{io_err, SkipReason, TransferError};

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Payloads of this many bytes or fewer are never tiles.
const MIN_PAYLOAD_LEN: usize = 8;

/// Suffix of partially written files; never imported.
pub(crate) const TEMP_SUFFIX: &str = ".temp";

/// Counts for one imported directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Import every directory of `config` into its database.
pub fn import(config: &TransferConfig) -> Result<Vec<(LayerName, ImportReport)>, TransferError> {
    let mut store = TileStore::open(&config.database, Access::ReadWrite)?;
    let mut reports = Vec::with_capacity(config.dirs.len());
    for job in &config.dirs {
        let report = import_dir(&mut store, &job.dir(), &job.layer, job.flip_y)?;
        reports.push((job.layer.clone(), report));
    }
    store.close()?;
    Ok(reports)
}

/// Import the tile tree under `root` into `layer`, creating the layer if needed.
///
/// Existing records at the same key are replaced.
pub fn import_dir(
    store: &mut TileStore,
    root: &Path,
    layer: &LayerName,
    flip_y: bool,
) -> Result<ImportReport, TransferError> {
    tracing::info!(
        "{layer}: importing {} into {}",
        root.display(),
        store.path().display()
    );
    let txn = store.transaction()?;
    let target = txn.open_layer(Schema::Main, layer, LayerMode::Write)?;

    let mut report = ImportReport::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if entry.file_name().to_string_lossy().ends_with(TEMP_SUFFIX) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let Some(key) = tile_key(relative, flip_y) else {
            skip(layer, path, SkipReason::InvalidPath, &mut report);
            continue;
        };

        let payload = fs::read(path).map_err(|e| io_err(path, e))?;
        if !is_tile_payload(&payload) {
            skip(layer, path, SkipReason::InvalidPayload, &mut report);
            continue;
        }

        let modified = entry
            .metadata()?
            .modified()
            .map_err(|e| io_err(path, e))?;
        let updated_at = UpdatedAt::from_datetime(DateTime::<Utc>::from(modified));
        tracing::debug!("{layer}: {key} {updated_at} <- {}", path.display());

        txn.upsert(
            &target,
            &TileRecord {
                key,
                updated_at,
                payload,
            },
        )?;
        report.imported += 1;
    }

    txn.commit()?;
    tracing::info!(
        "{layer}: imported {} tiles, skipped {}",
        report.imported,
        report.skipped
    );
    Ok(report)
}

/// Whether `payload` looks like a JPEG or PNG tile.
pub fn is_tile_payload(payload: &[u8]) -> bool {
    payload.len() > MIN_PAYLOAD_LEN
        && (payload.starts_with(JPEG_MAGIC) || payload.starts_with(PNG_MAGIC))
}

/// Parse the last three components of `relative` as `zoom/x/y.<ext>`.
fn tile_key(relative: &Path, flip_y: bool) -> Option<TileKey> {
    let parts = relative
        .components()
        .map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<&str>>>()?;
    let [.., zoom, x, file] = parts.as_slice() else {
        return None;
    };
    let y = file.split('.').next()?;
    let key = TileKey::new(x.parse().ok()?, y.parse().ok()?, zoom.parse().ok()?);
    if flip_y {
        key.flip_y()
    } else {
        Some(key)
    }
}

fn skip(layer: &LayerName, path: &Path, reason: SkipReason, report: &mut ImportReport) {
    tracing::warn!("{layer}: skipping {}: {reason}", path.display());
    report.skipped += 1;
}
