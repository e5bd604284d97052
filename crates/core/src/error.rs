//! Error types for tileshed

use thiserror::Error;

/// Main error type for tileshed operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid layer: {reason}")]
    InvalidLayer { reason: String },

    #[error("Observer ({x}, {y}) does not map to a single tile of the layout")]
    ObserverOutOfLayout { x: f64, y: f64 },

    #[error("Observer index {index} missing from broadcast tables")]
    ObserverUnknownIndex { index: u32 },

    #[error("Substrate failure: {detail}")]
    SubstrateFailure { detail: String },

    #[error("Index out of bounds: ({row}, {col}) in tile of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Invalid tile dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Invalid parameter: {name} ({reason})")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
}

/// Result type alias for tileshed operations
pub type Result<T> = std::result::Result<T, Error>;
