//! # tileshed-engine
//!
//! Iterative tile-parallel R2 viewshed over tiled elevation layers.
//!
//! Single-tile viewsheds emit boundary rays that become work items for
//! neighboring tiles; the driver iterates until no ray packets remain in
//! flight. The modules map onto the engine's moving parts:
//!
//! - **resolution**: meters-per-pixel from the layer CRS and layout
//! - **observer**: observer elaboration and broadcast tables
//! - **kernel**: the single-tile R2 sweep
//! - **ray** / **operator**: ray packets and per-pixel aggregation
//! - **driver**: seeding, iteration to quiescence, finalization

pub mod driver;
pub mod kernel;
pub mod observer;
pub mod operator;
pub mod ray;
pub mod resolution;

pub use driver::{viewshed, RayPacketBus, ViewshedParams};
pub use kernel::{sweep_tile, KernelParams};
pub use observer::{points_from_wire, Point6D, PointInfo};
pub use operator::{AggregationOperator, VISIBILITY_NODATA};
pub use ray::{Direction, Message, Ray};
pub use resolution::layer_resolution;

use tileshed_core::{Algorithm, Error, TileLayer};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::driver::{viewshed, ViewshedParams};
    pub use crate::kernel::{sweep_tile, KernelParams};
    pub use crate::observer::{points_from_wire, Point6D, PointInfo};
    pub use crate::operator::{AggregationOperator, VISIBILITY_NODATA};
    pub use crate::ray::{Direction, Message, Ray};
    pub use crate::IterativeViewshed;
    pub use tileshed_core::prelude::*;
}

/// Iterative distributed viewshed algorithm
#[derive(Debug, Clone, Default)]
pub struct IterativeViewshed;

impl Algorithm for IterativeViewshed {
    type Input = (TileLayer<f64>, Vec<Point6D>);
    type Output = TileLayer<i32>;
    type Params = ViewshedParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "IterativeViewshed"
    }

    fn description(&self) -> &'static str {
        "Tile-parallel R2 viewshed iterated to quiescence over a tiled elevation layer"
    }

    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> Result<Self::Output, Self::Error> {
        let (elevation, points) = input;
        viewshed(&elevation, &points, params, None)
    }
}
