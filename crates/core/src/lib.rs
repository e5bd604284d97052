//! # tileshed-core
//!
//! Core types for the tileshed viewshed engine.
//!
//! This crate provides:
//! - `Tile<T>`: dense 2D grid, the engine's unit of work
//! - `TileLayer<T>` and `LayerMetadata`: keyed tile collections
//! - `LayoutDefinition`: the regular tile grid over a world extent
//! - `Crs`, `GeoTransform`: coordinate handling
//! - The `Algorithm` trait for a consistent API

pub mod crs;
pub mod error;
pub mod grid;
pub mod layer;

pub use crs::{Crs, EARTH_RADIUS};
pub use error::{Error, Result};
pub use grid::{GeoTransform, GridElement, Tile};
pub use layer::{CellType, Extent, KeyBounds, LayerMetadata, LayoutDefinition, TileKey, TileLayer};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, Result};
    pub use crate::grid::{GeoTransform, GridElement, Tile};
    pub use crate::layer::{
        CellType, Extent, KeyBounds, LayerMetadata, LayoutDefinition, TileKey, TileLayer,
    };
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in tileshed.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
