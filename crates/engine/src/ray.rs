//! Rays, edge directions and cross-tile ray packets

use serde::{Deserialize, Serialize};
use tileshed_core::TileKey;

/// One line of sight crossing the current tile.
///
/// `theta` is the launch azimuth from the originating observer and is
/// preserved for the whole life of the ray; `alpha` (the running tangent of
/// the elevation angle), `v0` (intensity) and `metric0` (traveled metric
/// distance) describe the ray's state at its entry to the current tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub theta: f64,
    pub alpha: f64,
    pub v0: f64,
    pub metric0: f64,
}

impl Ray {
    pub fn new(theta: f64, alpha: f64, v0: f64, metric0: f64) -> Self {
        Self {
            theta,
            alpha,
            v0,
            metric0,
        }
    }
}

/// Which side of a tile a ray packet enters through.
///
/// `FromInside` marks rays that originate within the tile itself and is
/// used only for the observer's host tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    FromNorth,
    FromEast,
    FromSouth,
    FromWest,
    FromInside,
}

impl Direction {
    /// The four edge directions in the fixed processing order
    pub const EDGES: [Direction; 4] = [
        Direction::FromNorth,
        Direction::FromEast,
        Direction::FromSouth,
        Direction::FromWest,
    ];

    /// The edge facing this one; `FromInside` is its own opposite.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::FromNorth => Direction::FromSouth,
            Direction::FromSouth => Direction::FromNorth,
            Direction::FromEast => Direction::FromWest,
            Direction::FromWest => Direction::FromEast,
            Direction::FromInside => Direction::FromInside,
        }
    }

    /// Key of the tile a packet tagged with this direction is addressed
    /// to, relative to the emitting tile.
    ///
    /// A packet tagged `FromSouth` enters its target through the target's
    /// south edge, so the target is the emitter's northern neighbor (key
    /// rows grow south).
    pub fn neighbor_of(self, key: TileKey) -> Option<TileKey> {
        match self {
            Direction::FromSouth => Some(TileKey::new(key.col, key.row - 1)),
            Direction::FromNorth => Some(TileKey::new(key.col, key.row + 1)),
            Direction::FromWest => Some(TileKey::new(key.col + 1, key.row)),
            Direction::FromEast => Some(TileKey::new(key.col - 1, key.row)),
            Direction::FromInside => None,
        }
    }
}

/// A packet of rays emitted at a tile boundary, addressed to the neighbor
/// across `direction` on behalf of one observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub target_key: TileKey,
    pub observer_index: u32,
    pub direction: Direction,
    pub rays: Vec<Ray>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_keys() {
        let key = TileKey::new(3, 3);
        assert_eq!(
            Direction::FromSouth.neighbor_of(key),
            Some(TileKey::new(3, 2))
        );
        assert_eq!(
            Direction::FromNorth.neighbor_of(key),
            Some(TileKey::new(3, 4))
        );
        assert_eq!(
            Direction::FromWest.neighbor_of(key),
            Some(TileKey::new(4, 3))
        );
        assert_eq!(
            Direction::FromEast.neighbor_of(key),
            Some(TileKey::new(2, 3))
        );
        assert_eq!(Direction::FromInside.neighbor_of(key), None);
    }

    #[test]
    fn test_edge_order_is_fixed() {
        assert_eq!(
            Direction::EDGES,
            [
                Direction::FromNorth,
                Direction::FromEast,
                Direction::FromSouth,
                Direction::FromWest
            ]
        );
    }
}
