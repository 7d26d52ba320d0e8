//! Domain types for tile caches.
//!
//! Coordinates are `i64` to match SQLite `INTEGER` columns. Timestamps are
//! kept as the stored text so comparisons match what the database sees.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Storage format of `updatedAt`, always UTC.
pub const UPDATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Table name prefix for every layer.
pub const LAYER_TABLE_PREFIX: &str = "T_";

// ---------------------------------------------------------------------------
// Tile key
// ---------------------------------------------------------------------------

/// Coordinate of a tile within a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub x: i64,
    pub y: i64,
    pub zoom: i64,
}

impl TileKey {
    pub fn new(x: i64, y: i64, zoom: i64) -> Self {
        Self { x, y, zoom }
    }

    /// Convert between top-down and bottom-up row numbering:
    /// `y' = (1 << zoom) - y - 1`.
    ///
    /// Returns `None` when `zoom` would overflow the shift.
    pub fn flip_y(self) -> Option<Self> {
        if !(0..=62).contains(&self.zoom) {
            return None;
        }
        let rows = 1_i64 << self.zoom;
        Some(Self {
            y: rows - self.y - 1,
            ..self
        })
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// `updatedAt` column value. Ordered by string comparison, which is
/// chronological for the `YYYY-MM-DD HH:MM:SS` UTC format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UpdatedAt(pub String);

impl UpdatedAt {
    /// Format a UTC instant, truncating to whole seconds.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(UPDATED_AT_FORMAT).to_string())
    }

    /// Parse the stored text back into a UTC instant.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(&self.0, UPDATED_AT_FORMAT).map(|naive| naive.and_utc())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UpdatedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UpdatedAt {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for UpdatedAt {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Tile record
// ---------------------------------------------------------------------------

/// A full row of a layer table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub key: TileKey,
    pub updated_at: UpdatedAt,
    pub payload: Vec<u8>,
}

impl TileRecord {
    /// Empty payloads mark known-absent tiles and are always stale.
    pub fn is_placeholder(&self) -> bool {
        self.payload.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Layer names
// ---------------------------------------------------------------------------

/// Caller-supplied layer identifier (usually a cache directory name).
///
/// The name is untrusted: it only ever reaches SQL through
/// [`LayerName::quoted_table`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LayerName(String);

impl LayerName {
    pub fn new(name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(StoreError::InvalidLayerName {
                name,
                reason: "name is empty",
            });
        }
        if name.contains('\0') {
            return Err(StoreError::InvalidLayerName {
                name,
                reason: "name contains a NUL byte",
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unquoted table name, `T_<name>`.
    pub fn table_name(&self) -> String {
        format!("{LAYER_TABLE_PREFIX}{}", self.0)
    }

    /// Table name as a double-quoted SQL identifier.
    pub fn quoted_table(&self) -> String {
        quote_identifier(&self.table_name())
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for LayerName {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for LayerName {
    type Error = StoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<LayerName> for String {
    fn from(name: LayerName) -> Self {
        name.0
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
pub(crate) fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// Merge policy
// ---------------------------------------------------------------------------

/// How the destination layer may change during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// New keys may be introduced; the destination layer is created if missing.
    #[default]
    Full,
    /// Only keys already present in the destination are refreshed.
    UpdateOnly,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::Full => write!(f, "full"),
            MergePolicy::UpdateOnly => write!(f, "update-only"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
