//! Tiled layers: metadata plus a keyed collection of tiles

mod key;
mod layout;

pub use key::{KeyBounds, TileKey};
pub use layout::{Extent, LayoutDefinition};

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::grid::{GridElement, Tile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declared element type of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CellType {
    /// 64-bit float cells (NaN is no-data)
    F64,
    /// 32-bit integer cells with an explicit no-data value
    I32 { nodata: i32 },
}

/// Metadata shared by every tile of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    pub cell_type: CellType,
    pub layout: LayoutDefinition,
    pub crs: Crs,
    pub bounds: KeyBounds,
}

impl LayerMetadata {
    /// Validate that the metadata describes a usable layer
    pub fn validate(&self) -> Result<()> {
        if !self.bounds.is_valid() {
            return Err(Error::InvalidLayer {
                reason: format!(
                    "bounds {} .. {} is not a rectangle",
                    self.bounds.min_key, self.bounds.max_key
                ),
            });
        }
        if self.layout.tile_cols == 0 || self.layout.tile_rows == 0 {
            return Err(Error::InvalidLayer {
                reason: "zero-sized tiles".to_string(),
            });
        }
        Ok(())
    }
}

/// A tiled layer: a `TileKey -> Tile` mapping plus shared metadata.
///
/// Elevation layers are read-only inputs to the engine; visibility layers
/// are its output. Both use the same container.
#[derive(Debug, Clone)]
pub struct TileLayer<T: GridElement> {
    tiles: HashMap<TileKey, Tile<T>>,
    metadata: LayerMetadata,
}

impl<T: GridElement> TileLayer<T> {
    pub fn new(metadata: LayerMetadata) -> Self {
        Self {
            tiles: HashMap::new(),
            metadata,
        }
    }

    pub fn from_tiles(tiles: HashMap<TileKey, Tile<T>>, metadata: LayerMetadata) -> Self {
        Self { tiles, metadata }
    }

    pub fn metadata(&self) -> &LayerMetadata {
        &self.metadata
    }

    pub fn insert(&mut self, key: TileKey, tile: Tile<T>) {
        self.tiles.insert(key, tile);
    }

    pub fn get(&self, key: TileKey) -> Option<&Tile<T>> {
        self.tiles.get(&key)
    }

    pub fn get_mut(&mut self, key: TileKey) -> Option<&mut Tile<T>> {
        self.tiles.get_mut(&key)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        self.tiles.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileKey, &Tile<T>)> + '_ {
        self.tiles.iter().map(|(k, t)| (*k, t))
    }

    /// Consume the layer, returning its tiles and metadata
    pub fn into_parts(self) -> (HashMap<TileKey, Tile<T>>, LayerMetadata) {
        (self.tiles, self.metadata)
    }

    /// Read the value at a global `(key, col, row)` pixel address
    pub fn value_at(&self, key: TileKey, row: usize, col: usize) -> Result<T> {
        let tile = self.get(key).ok_or_else(|| Error::InvalidLayer {
            reason: format!("no tile at key {key}"),
        })?;
        tile.get(row, col)
    }
}
