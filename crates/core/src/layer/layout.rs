//! Layer layout: world extent and the regular tile grid over it

use crate::grid::GeoTransform;
use crate::layer::{KeyBounds, TileKey};
use serde::{Deserialize, Serialize};

/// A world-space bounding box in CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Whether the point lies inside the extent (edges inclusive)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.xmin <= x && x <= self.xmax && self.ymin <= y && y <= self.ymax
    }
}

/// Regular tiling of an extent: `layout_cols x layout_rows` tiles of
/// `tile_cols x tile_rows` pixels each.
///
/// Tile key `(0, 0)` is the northwest corner; key columns grow east and
/// key rows grow south, matching pixel row order inside a tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutDefinition {
    /// World extent covered by the full layout
    pub extent: Extent,
    /// Pixel columns per tile
    pub tile_cols: usize,
    /// Pixel rows per tile
    pub tile_rows: usize,
    /// Tile columns in the layout grid
    pub layout_cols: usize,
    /// Tile rows in the layout grid
    pub layout_rows: usize,
}

impl LayoutDefinition {
    pub fn new(
        extent: Extent,
        tile_cols: usize,
        tile_rows: usize,
        layout_cols: usize,
        layout_rows: usize,
    ) -> Self {
        Self {
            extent,
            tile_cols,
            tile_rows,
            layout_cols,
            layout_rows,
        }
    }

    /// World width of one tile
    pub fn tile_width_world(&self) -> f64 {
        self.extent.width() / self.layout_cols as f64
    }

    /// World height of one tile
    pub fn tile_height_world(&self) -> f64 {
        self.extent.height() / self.layout_rows as f64
    }

    /// World width of one pixel
    pub fn cell_width(&self) -> f64 {
        self.tile_width_world() / self.tile_cols as f64
    }

    /// World height of one pixel
    pub fn cell_height(&self) -> f64 {
        self.tile_height_world() / self.tile_rows as f64
    }

    /// Total pixel columns across the layout
    pub fn total_cols(&self) -> usize {
        self.layout_cols * self.tile_cols
    }

    /// Total pixel rows across the layout
    pub fn total_rows(&self) -> usize {
        self.layout_rows * self.tile_rows
    }

    /// World extent of one tile
    pub fn key_extent(&self, key: TileKey) -> Extent {
        let tw = self.tile_width_world();
        let th = self.tile_height_world();
        let xmin = self.extent.xmin + key.col as f64 * tw;
        let ymax = self.extent.ymax - key.row as f64 * th;
        Extent::new(xmin, ymax - th, xmin + tw, ymax)
    }

    /// Pixel transform of one tile
    pub fn tile_transform(&self, key: TileKey) -> GeoTransform {
        let e = self.key_extent(key);
        GeoTransform::new(e.xmin, e.ymax, self.cell_width(), -self.cell_height())
    }

    /// Map a point to the tile keys covering it.
    ///
    /// Returns `None` when the point falls outside the extent. A point on
    /// an interior tile seam is covered by both adjacent tiles and the
    /// returned bounds span more than one key; callers that need a unique
    /// host tile must reject that case. The outer east/south edges belong
    /// to the last tile column/row.
    pub fn keys_for_point(&self, x: f64, y: f64) -> Option<KeyBounds> {
        if !self.extent.contains(x, y) {
            return None;
        }

        let tx = (x - self.extent.xmin) / self.tile_width_world();
        let ty = (self.extent.ymax - y) / self.tile_height_world();

        let col_hi = (tx.floor() as i32).min(self.layout_cols as i32 - 1);
        let row_hi = (ty.floor() as i32).min(self.layout_rows as i32 - 1);

        let on_col_seam = tx.fract() == 0.0 && tx > 0.0 && (tx as usize) < self.layout_cols;
        let on_row_seam = ty.fract() == 0.0 && ty > 0.0 && (ty as usize) < self.layout_rows;

        let col_lo = if on_col_seam { col_hi - 1 } else { col_hi };
        let row_lo = if on_row_seam { row_hi - 1 } else { row_hi };

        Some(KeyBounds::new(
            TileKey::new(col_lo, row_lo),
            TileKey::new(col_hi, row_hi),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn layout() -> LayoutDefinition {
        // 3x3 tiles of 256x256 pixels, one world unit per pixel
        LayoutDefinition::new(Extent::new(0.0, 0.0, 768.0, 768.0), 256, 256, 3, 3)
    }

    #[test]
    fn test_cell_size() {
        let l = layout();
        assert_relative_eq!(l.cell_width(), 1.0);
        assert_relative_eq!(l.cell_height(), 1.0);
        assert_eq!(l.total_cols(), 768);
    }

    #[test]
    fn test_key_extent() {
        let l = layout();
        let e = l.key_extent(TileKey::new(1, 2));
        assert_relative_eq!(e.xmin, 256.0);
        assert_relative_eq!(e.xmax, 512.0);
        assert_relative_eq!(e.ymax, 256.0);
        assert_relative_eq!(e.ymin, 0.0);
    }

    #[test]
    fn test_point_to_single_key() {
        let l = layout();
        let kb = l.keys_for_point(300.0, 700.0).unwrap();
        assert_eq!(kb.min_key, kb.max_key);
        assert_eq!(kb.min_key, TileKey::new(1, 0));
    }

    #[test]
    fn test_point_on_seam_spans_two_keys() {
        let l = layout();
        let kb = l.keys_for_point(256.0, 700.0).unwrap();
        assert_eq!(kb.min_key, TileKey::new(0, 0));
        assert_eq!(kb.max_key, TileKey::new(1, 0));
    }

    #[test]
    fn test_point_outside_extent() {
        let l = layout();
        assert!(l.keys_for_point(-1.0, 100.0).is_none());
        assert!(l.keys_for_point(100.0, 769.0).is_none());
    }

    #[test]
    fn test_outer_edge_belongs_to_last_tile() {
        let l = layout();
        let kb = l.keys_for_point(768.0, 0.0).unwrap();
        assert_eq!(kb.min_key, kb.max_key);
        assert_eq!(kb.max_key, TileKey::new(2, 2));
    }

    #[test]
    fn test_tile_transform_intra_tile_coords() {
        let l = layout();
        let gt = l.tile_transform(TileKey::new(1, 1));
        let (col, row) = gt.geo_to_pixel(300.5, 400.5);
        assert_eq!(col.floor() as usize, 44);
        assert_eq!(row.floor() as usize, 111);
    }
}
