//! Boundary readers/writers for tiled layers

use std::collections::HashMap;
use tileshed_core::{Error, Result, TileLayer};

/// Identifier of a stored layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// A layer at rest, tagged by its role in the engine.
///
/// Elevation layers enter the engine; visibility layers leave it. Tile
/// encoding/decoding against real formats happens outside this crate.
#[derive(Debug, Clone)]
pub enum StoredLayer {
    Elevation(TileLayer<f64>),
    Visibility(TileLayer<i32>),
}

/// Load a `TileKey -> Tile` mapping with its metadata
pub trait LayerReader {
    fn read(&self, id: &LayerId) -> Result<StoredLayer>;
}

/// Store a `TileKey -> Tile` mapping with its metadata
pub trait LayerWriter {
    fn write(&mut self, id: LayerId, layer: StoredLayer) -> Result<()>;
}

/// In-process layer store used at the engine's boundaries and in tests.
#[derive(Debug, Default)]
pub struct InMemoryLayerStore {
    layers: HashMap<LayerId, StoredLayer>,
}

impl InMemoryLayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl LayerReader for InMemoryLayerStore {
    fn read(&self, id: &LayerId) -> Result<StoredLayer> {
        self.layers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::InvalidLayer {
                reason: format!("no layer stored under '{}'", id.0),
            })
    }
}

impl LayerWriter for InMemoryLayerStore {
    fn write(&mut self, id: LayerId, layer: StoredLayer) -> Result<()> {
        self.layers.insert(id, layer);
        Ok(())
    }
}
