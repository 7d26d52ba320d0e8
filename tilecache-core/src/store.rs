//! SQLite-backed tile stores.
//!
//! # Storage layout
//!
//! ```text
//! <store>.db
//!   T_<layer>   (x INTEGER, y INTEGER, zoom INTEGER, updatedAt TEXT, payload BLOB,
//!                PRIMARY KEY (x, y, zoom))
//! ```
//!
//! # Handles
//!
//! - [`TileStore`]: one store file, layers in the `main` schema. Used by
//!   import and export.
//! - [`SyncStores`]: an in-memory connection with the source attached
//!   read-only as `src` and the destination attached read-write as `dst`, so
//!   one statement can join both sides.
//!
//! All reads and writes go through a [`StoreTxn`]. Committing it is what makes
//! a layer's writes durable; dropping it rolls them back.
//!
//! Layer names only reach SQL via [`Layer::qualified`]; every value is a bound
//! parameter.

use std::fmt;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, Transaction};

use crate::error::{io_err, StoreError};
use crate::types::{LayerName, MergePolicy, TileKey, TileRecord, UpdatedAt};

// ---------------------------------------------------------------------------
// Handle vocabulary
// ---------------------------------------------------------------------------

/// How a single-file store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Which attached database a layer lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    Main,
    Source,
    Destination,
}

impl Schema {
    fn alias(self) -> &'static str {
        match self {
            Schema::Main => "main",
            Schema::Source => "src",
            Schema::Destination => "dst",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Main => write!(f, "main"),
            Schema::Source => write!(f, "source"),
            Schema::Destination => write!(f, "destination"),
        }
    }
}

/// Whether [`StoreTxn::open_layer`] may create the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerMode {
    /// The table must already exist.
    Read,
    /// The table is created if absent.
    Write,
}

/// An opened layer: a schema plus a validated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    schema: Schema,
    name: LayerName,
}

impl Layer {
    pub fn name(&self) -> &LayerName {
        &self.name
    }

    /// `<alias>."T_<name>"`, safe to splice into a statement.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema.alias(), self.name.quoted_table())
    }
}

/// Result of a point lookup.
///
/// `Duplicate` means the layer holds more than one row for the key, which only
/// happens when the table was created without its primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetch {
    One(TileRecord),
    Missing,
    Duplicate(usize),
}

/// One row of a joined source/destination scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    pub key: TileKey,
    pub source_updated: UpdatedAt,
    /// `None` when the destination has no record for the key.
    pub destination_updated: Option<UpdatedAt>,
}

// ---------------------------------------------------------------------------
// Single-file store
// ---------------------------------------------------------------------------

/// One tile store file.
#[derive(Debug)]
pub struct TileStore {
    conn: Connection,
    path: PathBuf,
    access: Access,
}

impl TileStore {
    /// Open the store at `path`.
    ///
    /// `Access::ReadOnly` requires the file to exist; `Access::ReadWrite`
    /// creates it (and its parent directory) when missing.
    pub fn open(path: impl AsRef<Path>, access: Access) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let flags = match access {
            Access::ReadOnly => {
                if !path.exists() {
                    return Err(StoreError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
            }
            Access::ReadWrite => {
                ensure_parent_dir(path)?;
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX
            }
        };
        let conn = Connection::open_with_flags(path, flags)?;
        tracing::debug!("opened tile store {} ({:?})", path.display(), access);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            access,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the unit of work for one layer.
    pub fn transaction(&mut self) -> Result<StoreTxn<'_>, StoreError> {
        let read_only = match self.access {
            Access::ReadOnly => Some(Schema::Main),
            Access::ReadWrite => None,
        };
        Ok(StoreTxn {
            tx: self.conn.transaction()?,
            read_only,
        })
    }

    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}

// ---------------------------------------------------------------------------
// Source + destination pair
// ---------------------------------------------------------------------------

/// Source (read-only) and destination (read-write) stores on one connection.
#[derive(Debug)]
pub struct SyncStores {
    conn: Connection,
    source: PathBuf,
    destination: PathBuf,
}

impl SyncStores {
    /// Attach `source` read-only and `destination` read-write.
    ///
    /// The destination file is created when missing. Both paths must name
    /// different files.
    pub fn open(
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<Self, StoreError> {
        let source = source.as_ref();
        let destination = destination.as_ref();

        if !source.exists() {
            return Err(StoreError::NotFound {
                path: source.to_path_buf(),
            });
        }
        if destination.exists() {
            let src = source.canonicalize().map_err(|e| io_err(source, e))?;
            let dst = destination
                .canonicalize()
                .map_err(|e| io_err(destination, e))?;
            if src == dst {
                return Err(StoreError::SameStore { path: src });
            }
        }
        ensure_parent_dir(destination)?;

        let conn = Connection::open_in_memory()?;
        conn.execute(
            "ATTACH DATABASE ?1 AS src",
            params![sqlite_uri(source, "ro")?],
        )?;
        conn.execute(
            "ATTACH DATABASE ?1 AS dst",
            params![sqlite_uri(destination, "rwc")?],
        )?;
        tracing::debug!(
            "attached source {} and destination {}",
            source.display(),
            destination.display()
        );

        Ok(Self {
            conn,
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
        })
    }

    pub fn source_path(&self) -> &Path {
        &self.source
    }

    pub fn destination_path(&self) -> &Path {
        &self.destination
    }

    /// Start the unit of work for one layer.
    pub fn transaction(&mut self) -> Result<StoreTxn<'_>, StoreError> {
        Ok(StoreTxn {
            tx: self.conn.transaction()?,
            read_only: Some(Schema::Source),
        })
    }

    pub fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// All layer operations. Writes become visible to other connections only
/// after [`StoreTxn::commit`].
pub struct StoreTxn<'conn> {
    tx: Transaction<'conn>,
    read_only: Option<Schema>,
}

impl StoreTxn<'_> {
    /// Open `name` in `schema`. Idempotent.
    ///
    /// `LayerMode::Write` creates the table if absent;
    /// `LayerMode::Read` fails with [`StoreError::MissingLayer`] instead.
    pub fn open_layer(
        &self,
        schema: Schema,
        name: &LayerName,
        mode: LayerMode,
    ) -> Result<Layer, StoreError> {
        let layer = Layer {
            schema,
            name: name.clone(),
        };
        let exists = self.layer_exists(&layer)?;
        match mode {
            LayerMode::Read if !exists => Err(StoreError::MissingLayer {
                schema: schema.to_string(),
                layer: name.to_string(),
            }),
            LayerMode::Read => Ok(layer),
            LayerMode::Write => {
                self.ensure_writable(&layer)?;
                if !exists {
                    self.tx.execute_batch(&format!(
                        "CREATE TABLE IF NOT EXISTS {} (x INTEGER, y INTEGER, zoom INTEGER, \
                         updatedAt TEXT, payload BLOB, PRIMARY KEY (x, y, zoom))",
                        layer.qualified()
                    ))?;
                    tracing::info!("{}: created layer in {} store", name, schema);
                }
                Ok(layer)
            }
        }
    }

    /// Whether the layer's table exists in its schema.
    ///
    /// SQLite resolves table names without regard to ASCII case, so the
    /// catalog lookup does the same.
    pub fn layer_exists(&self, layer: &Layer) -> Result<bool, StoreError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            layer.schema.alias()
        );
        let count: i64 = self
            .tx
            .query_row(&sql, params![layer.name.table_name()], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Point lookup by key.
    pub fn get(&self, layer: &Layer, key: TileKey) -> Result<Fetch, StoreError> {
        let sql = format!(
            "SELECT updatedAt, payload FROM {} WHERE x = ?1 AND y = ?2 AND zoom = ?3",
            layer.qualified()
        );
        let mut stmt = self.tx.prepare_cached(&sql)?;
        let mut rows = stmt.query(params![key.x, key.y, key.zoom])?;

        let mut first = None;
        let mut count = 0usize;
        while let Some(row) = rows.next()? {
            count += 1;
            if first.is_none() {
                first = Some(TileRecord {
                    key,
                    updated_at: UpdatedAt(row.get::<_, Option<String>>(0)?.unwrap_or_default()),
                    payload: row.get::<_, Option<Vec<u8>>>(1)?.unwrap_or_default(),
                });
            }
        }

        Ok(match (count, first) {
            (1, Some(record)) => Fetch::One(record),
            (0, _) => Fetch::Missing,
            (n, _) => Fetch::Duplicate(n),
        })
    }

    /// Insert, or replace the whole record at the same key.
    pub fn upsert(&self, layer: &Layer, record: &TileRecord) -> Result<(), StoreError> {
        self.ensure_writable(layer)?;
        let sql = format!(
            "INSERT OR REPLACE INTO {} (x, y, zoom, updatedAt, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
            layer.qualified()
        );
        self.tx.prepare_cached(&sql)?.execute(params![
            record.key.x,
            record.key.y,
            record.key.zoom,
            record.updated_at.as_str(),
            record.payload,
        ])?;
        Ok(())
    }

    /// Stream the keys where `source` is fresher than `destination` under
    /// `policy`, ordered by `(zoom, x, y)`. Returns the number of rows.
    ///
    /// - `Full`: left outer join; a key qualifies when the destination lacks
    ///   it, holds an empty payload, or holds an older timestamp.
    /// - `UpdateOnly`: inner join; only the last two conditions apply.
    ///
    /// Either way the source payload must be non-empty.
    pub fn scan_joined<F>(
        &self,
        source: &Layer,
        destination: &Layer,
        policy: MergePolicy,
        mut visit: F,
    ) -> Result<usize, StoreError>
    where
        F: FnMut(JoinedRow),
    {
        let src = source.qualified();
        let dst = destination.qualified();
        let (join, absent) = match policy {
            MergePolicy::Full => ("LEFT OUTER JOIN", "d.x IS NULL OR "),
            MergePolicy::UpdateOnly => ("INNER JOIN", ""),
        };
        let sql = format!(
            "SELECT s.x, s.y, s.zoom, s.updatedAt, d.updatedAt, d.x IS NULL \
             FROM {src} AS s {join} {dst} AS d \
             ON s.x = d.x AND s.y = d.y AND s.zoom = d.zoom \
             WHERE IFNULL(LENGTH(s.payload), 0) > 0 \
             AND ({absent}IFNULL(LENGTH(d.payload), 0) = 0 OR s.updatedAt > d.updatedAt) \
             ORDER BY s.zoom, s.x, s.y"
        );

        let mut stmt = self.tx.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut count = 0usize;
        while let Some(row) = rows.next()? {
            let absent: bool = row.get(5)?;
            let destination_updated = if absent {
                None
            } else {
                Some(UpdatedAt(row.get::<_, Option<String>>(4)?.unwrap_or_default()))
            };
            visit(JoinedRow {
                key: TileKey::new(row.get(0)?, row.get(1)?, row.get(2)?),
                source_updated: UpdatedAt(row.get::<_, Option<String>>(3)?.unwrap_or_default()),
                destination_updated,
            });
            count += 1;
        }
        Ok(count)
    }

    /// Stream every record of `layer` in `(zoom, x, y)` order.
    pub fn scan<F, E>(&self, layer: &Layer, mut visit: F) -> Result<usize, E>
    where
        F: FnMut(TileRecord) -> Result<(), E>,
        E: From<StoreError>,
    {
        let sql = format!(
            "SELECT x, y, zoom, updatedAt, payload FROM {} ORDER BY zoom, x, y",
            layer.qualified()
        );
        let mut stmt = self.tx.prepare(&sql).map_err(StoreError::from)?;
        let mut rows = stmt.query([]).map_err(StoreError::from)?;
        let mut count = 0usize;
        while let Some(row) = rows.next().map_err(StoreError::from)? {
            let record = read_record(row).map_err(StoreError::from)?;
            visit(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Number of records in `layer`.
    pub fn count(&self, layer: &Layer) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", layer.qualified());
        let count: i64 = self.tx.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Make every write issued through this transaction durable.
    pub fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }

    /// Discard every write issued through this transaction.
    pub fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback()?;
        Ok(())
    }

    fn ensure_writable(&self, layer: &Layer) -> Result<(), StoreError> {
        if self.read_only == Some(layer.schema) {
            return Err(StoreError::ReadOnly {
                schema: layer.schema.to_string(),
                layer: layer.name.to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TileRecord> {
    Ok(TileRecord {
        key: TileKey::new(row.get(0)?, row.get(1)?, row.get(2)?),
        updated_at: UpdatedAt(row.get::<_, Option<String>>(3)?.unwrap_or_default()),
        payload: row.get::<_, Option<Vec<u8>>>(4)?.unwrap_or_default(),
    })
}

fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))
        }
        _ => Ok(()),
    }
}

/// `file:` URI for ATTACH, with the characters SQLite treats specially in a
/// URI path escaped.
fn sqlite_uri(path: &Path, mode: &str) -> Result<String, StoreError> {
    let raw = path.to_str().ok_or_else(|| StoreError::NonUtf8Path {
        path: path.to_path_buf(),
    })?;
    let escaped = raw
        .replace('%', "%25")
        .replace('?', "%3F")
        .replace('#', "%23");
    Ok(format!("file:{escaped}?mode={mode}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
