//! Observer points and their elaboration against a layer

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tileshed_core::{Error, LayerMetadata, Result, Tile, TileKey};
use tileshed_runtime::PartitionedDataset;

/// An observer as supplied by the caller, in layer CRS units.
///
/// Sentinels follow the wire convention:
/// - `view_height < 0`: its absolute value is an absolute height rather
///   than a height above terrain
/// - `field_of_view < 0`: omnidirectional
/// - `altitude == -inf`: sight terrain height rather than a fixed altitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point6D {
    pub x: f64,
    pub y: f64,
    pub view_height: f64,
    /// Azimuth of the camera in radians (east = 0, counterclockwise)
    pub angle: f64,
    /// Field of view in radians; negative means omnidirectional
    pub field_of_view: f64,
    /// Target altitude in meters; `-inf` means terrain height
    pub altitude: f64,
}

impl Point6D {
    pub fn new(
        x: f64,
        y: f64,
        view_height: f64,
        angle: f64,
        field_of_view: f64,
        altitude: f64,
    ) -> Self {
        Self {
            x,
            y,
            view_height,
            angle,
            field_of_view,
            altitude,
        }
    }

    /// An observer with no camera restriction sighting terrain
    pub fn omnidirectional(x: f64, y: f64, view_height: f64) -> Self {
        Self::new(x, y, view_height, 0.0, -1.0, f64::NEG_INFINITY)
    }

    pub fn is_omnidirectional(&self) -> bool {
        self.field_of_view < 0.0
    }

    /// Decode from the six-double wire form
    pub fn from_wire(values: [f64; 6]) -> Self {
        Self::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        )
    }

    /// Encode to the six-double wire form
    pub fn to_wire(&self) -> [f64; 6] {
        [
            self.x,
            self.y,
            self.view_height,
            self.angle,
            self.field_of_view,
            self.altitude,
        ]
    }
}

/// Decode a flat sequence of doubles into observers, six per point
pub fn points_from_wire(values: &[f64]) -> Result<Vec<Point6D>> {
    if values.len() % 6 != 0 {
        return Err(Error::InvalidParameter {
            name: "points",
            reason: format!("wire length {} is not a multiple of 6", values.len()),
        });
    }
    Ok(values
        .chunks_exact(6)
        .map(|c| Point6D::from_wire([c[0], c[1], c[2], c[3], c[4], c[5]]))
        .collect())
}

/// An observer elaborated against the layer: host tile key, intra-tile
/// pixel, and the camera fields it carries through every iteration.
///
/// `index` is the observer's stable identity; `(key, col, row)` names a
/// unique pixel of the layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointInfo {
    pub index: u32,
    pub key: TileKey,
    pub col: usize,
    pub row: usize,
    pub view_height: f64,
    pub angle: f64,
    pub fov: f64,
    pub alt: f64,
}

/// Map each observer to its host tile and intra-tile pixel.
///
/// Fails with `ObserverOutOfLayout` when a point falls outside the layer
/// extent, on a tile seam (covered by more than one tile), or on a key
/// outside the layer bounds.
pub fn resolve_observers(metadata: &LayerMetadata, points: &[Point6D]) -> Result<Vec<PointInfo>> {
    metadata.validate()?;
    let layout = &metadata.layout;

    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let covering = layout
                .keys_for_point(p.x, p.y)
                .ok_or(Error::ObserverOutOfLayout { x: p.x, y: p.y })?;
            if covering.min_key != covering.max_key {
                return Err(Error::ObserverOutOfLayout { x: p.x, y: p.y });
            }
            let key = covering.min_key;
            if !metadata.bounds.contains(key) {
                return Err(Error::ObserverOutOfLayout { x: p.x, y: p.y });
            }

            let transform = layout.tile_transform(key);
            let (col_f, row_f) = transform.geo_to_pixel(p.x, p.y);
            let col = (col_f.floor() as i64).clamp(0, layout.tile_cols as i64 - 1) as usize;
            let row = (row_f.floor() as i64).clamp(0, layout.tile_rows as i64 - 1) as usize;

            Ok(PointInfo {
                index: i as u32,
                key,
                col,
                row,
                view_height: p.view_height,
                angle: p.angle,
                fov: p.field_of_view,
                alt: p.altitude,
            })
        })
        .collect()
}

/// Group elaborated observers by host tile key, ascending by index within
/// each group
pub fn group_by_key(infos: &[PointInfo]) -> HashMap<TileKey, Vec<PointInfo>> {
    let mut grouped: HashMap<TileKey, Vec<PointInfo>> = HashMap::new();
    for info in infos {
        grouped.entry(info.key).or_default().push(*info);
    }
    for hosted in grouped.values_mut() {
        hosted.sort_by_key(|i| i.index);
    }
    grouped
}

/// Index-keyed lookup table; observer indices must be unique
pub fn index_table(infos: &[PointInfo]) -> Result<HashMap<u32, PointInfo>> {
    let mut table = HashMap::with_capacity(infos.len());
    for info in infos {
        if table.insert(info.index, *info).is_some() {
            return Err(Error::InvalidParameter {
                name: "points",
                reason: format!("duplicate observer index {}", info.index),
            });
        }
    }
    Ok(table)
}

/// Compute each observer's effective view height with a distributed lookup
/// of the elevation at its host pixel.
///
/// Non-negative `view_height` is height above terrain; negative
/// `view_height` is an absolute height (its magnitude).
pub fn effective_heights<D>(
    elevation: &D,
    by_key: &HashMap<TileKey, Vec<PointInfo>>,
) -> Result<HashMap<u32, f64>>
where
    D: PartitionedDataset<TileKey, Tile<f64>>,
{
    let pairs = elevation.flat_map(|key, tile| {
        by_key
            .get(key)
            .map(|hosted| {
                hosted
                    .iter()
                    .filter_map(|info| {
                        let e = tile.get(info.row, info.col).ok()?;
                        let height = if info.view_height >= 0.0 {
                            e + info.view_height
                        } else {
                            -info.view_height
                        };
                        Some((info.index, height))
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    })?;

    Ok(pairs.collect()?.into_iter().collect())
}
