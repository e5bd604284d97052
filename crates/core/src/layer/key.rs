//! Tile keys and key bounds

use serde::{Deserialize, Serialize};
use std::fmt;

/// `(col, row)` identifier of a tile within the layer grid.
///
/// Keys are signed: origin translation in the kernel walks through
/// neighbor keys that may lie transiently outside the layer, and the
/// driver bounds-checks them against [`KeyBounds`] before routing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileKey {
    pub col: i32,
    pub row: i32,
}

impl TileKey {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Inclusive rectangle of tile keys covered by a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBounds {
    pub min_key: TileKey,
    pub max_key: TileKey,
}

impl KeyBounds {
    pub fn new(min_key: TileKey, max_key: TileKey) -> Self {
        Self { min_key, max_key }
    }

    /// Whether this is a well-defined, non-empty rectangle
    pub fn is_valid(&self) -> bool {
        self.min_key.col <= self.max_key.col && self.min_key.row <= self.max_key.row
    }

    pub fn contains(&self, key: TileKey) -> bool {
        self.min_key.col <= key.col
            && key.col <= self.max_key.col
            && self.min_key.row <= key.row
            && key.row <= self.max_key.row
    }

    /// Number of key columns
    pub fn width(&self) -> usize {
        (self.max_key.col - self.min_key.col + 1).max(0) as usize
    }

    /// Number of key rows
    pub fn height(&self) -> usize {
        (self.max_key.row - self.min_key.row + 1).max(0) as usize
    }

    /// Iterate all keys in the rectangle, row-major
    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        let (min, max) = (self.min_key, self.max_key);
        (min.row..=max.row).flat_map(move |row| (min.col..=max.col).map(move |col| TileKey::new(col, row)))
    }
}
