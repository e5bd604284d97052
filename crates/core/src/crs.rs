//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Semi-major axis of the WGS84 spheroid in meters.
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Coordinate Reference System representation, keyed by EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    epsg: u32,
}

impl Crs {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// Get the EPSG code
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        self.epsg == other.epsg
    }

    /// Project a coordinate in this CRS to geographic (lng, lat) degrees.
    ///
    /// Analytic inverses exist for EPSG:4326 (identity) and EPSG:3857
    /// (inverse spherical Mercator). Returns `None` for other codes;
    /// callers fall back to treating CRS units as meters.
    pub fn to_geographic(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self.epsg {
            4326 => Some((x, y)),
            3857 => {
                let lng = x / EARTH_RADIUS * 180.0 / PI;
                let lat = ((y / EARTH_RADIUS).exp().atan() * 2.0 - PI / 2.0) * 180.0 / PI;
                Some((lng, lat))
            }
            _ => None,
        }
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}
