//! Meters-per-pixel estimation from layer metadata

use std::f64::consts::PI;
use tileshed_core::{LayerMetadata, Result, EARTH_RADIUS};

/// Estimate the ground resolution of a layer in meters per pixel.
///
/// Projects one tile's extent to geographic coordinates and converts its
/// longitude span to meters along the equator (`2*pi*R / 360` per degree).
/// The layout is assumed near-equidistant, so a single tile is
/// representative and the scalar is used uniformly.
///
/// For a CRS without an analytic geographic inverse the extent width is
/// taken to be meters already; callers with exotic projections should pass
/// an explicit resolution instead.
pub fn layer_resolution(metadata: &LayerMetadata) -> Result<f64> {
    metadata.validate()?;

    let extent = metadata.layout.key_extent(metadata.bounds.min_key);
    let mid_y = (extent.ymin + extent.ymax) / 2.0;

    let west = metadata.crs.to_geographic(extent.xmin, mid_y);
    let east = metadata.crs.to_geographic(extent.xmax, mid_y);

    let width_m = match (west, east) {
        (Some((lng_w, _)), Some((lng_e, _))) => {
            (lng_e - lng_w) * (2.0 * PI * EARTH_RADIUS) / 360.0
        }
        _ => extent.width(),
    };

    Ok(width_m / metadata.layout.tile_cols as f64)
}
