//! Tile grid data structures

mod element;
mod geotransform;

pub use element::GridElement;
pub use geotransform::GeoTransform;

use crate::error::{Error, Result};
use ndarray::Array2;

/// A dense 2D grid of cell values, the unit of work of the engine.
///
/// `Tile<T>` stores values of type `T` in row-major order. Unlike a
/// standalone raster it carries no georeferencing of its own: position and
/// cell size are derived from the owning layer's layout and the tile's key.
///
/// # Type Parameters
///
/// - `T`: The cell value type, must implement [`GridElement`]
#[derive(Debug, Clone, PartialEq)]
pub struct Tile<T: GridElement> {
    /// Cell data stored in row-major order (row, col)
    data: Array2<T>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: GridElement> Tile<T> {
    /// Create a new tile filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
            nodata: None,
        }
    }

    /// Create a new tile filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            nodata: None,
        }
    }

    /// Create a tile from existing row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions { rows, cols });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|_| Error::InvalidDimensions { rows, cols })?;

        Ok(Self {
            data: array,
            nodata: None,
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Set value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn set_unchecked(&mut self, row: usize, col: usize, value: T) {
        unsafe {
            *self.data.uget_mut((row, col)) = value;
        }
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Check if cell at (row, col) contains no-data
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(self.is_nodata(value))
    }

    /// Count of cells not equal to the no-data value
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !self.is_nodata(**v)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_creation() {
        let tile: Tile<f64> = Tile::new(100, 200);
        assert_eq!(tile.rows(), 100);
        assert_eq!(tile.cols(), 200);
        assert_eq!(tile.shape(), (100, 200));
    }

    #[test]
    fn test_tile_access() {
        let mut tile: Tile<f64> = Tile::new(10, 10);
        tile.set(5, 5, 42.0).unwrap();
        assert_eq!(tile.get(5, 5).unwrap(), 42.0);
        assert!(tile.get(10, 0).is_err());
    }

    #[test]
    fn test_tile_from_vec_bad_len() {
        assert!(Tile::from_vec(vec![0.0_f64; 9], 2, 5).is_err());
    }

    #[test]
    fn test_tile_nodata() {
        let mut tile: Tile<i32> = Tile::filled(4, 4, i32::MIN);
        tile.set_nodata(Some(i32::MIN));
        assert!(tile.is_nodata_at(0, 0).unwrap());
        assert_eq!(tile.valid_count(), 0);

        tile.set(1, 2, 1).unwrap();
        assert_eq!(tile.valid_count(), 1);
    }
}
