//! Single-tile R2 line-of-sight kernel
//!
//! Sweeps rays from an origin (which may lie outside the tile) to every
//! tile boundary pixel, maintaining the running maximum tangent of the
//! elevation angle along each ray, updating the visibility tile, and
//! collecting rays that leave the tile into per-side bundles for the
//! neighboring tiles.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};
use tileshed_core::{Tile, EARTH_RADIUS};

use crate::operator::AggregationOperator;
use crate::ray::{Direction, Ray};

/// Scalar parameters of one kernel invocation.
#[derive(Debug, Clone)]
pub struct KernelParams {
    /// Ground resolution in meters per pixel
    pub resolution: f64,
    /// Maximum metric ray length in meters
    pub max_distance: f64,
    /// Account for Earth curvature drop `d^2 / (2R)`
    pub curvature: bool,
    /// Sighted altitude in meters; `-inf` sights terrain height
    pub altitude: f64,
    /// Per-pixel aggregation
    pub operator: AggregationOperator,
    /// Camera azimuth in radians (east = 0, counterclockwise)
    pub camera_direction: f64,
    /// Camera field of view in radians; negative means omnidirectional
    pub camera_fov: f64,
    /// Angular tolerance for matching entering rays by theta
    pub epsilon: f64,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_distance: f64::INFINITY,
            curvature: true,
            altitude: f64::NEG_INFINITY,
            operator: AggregationOperator::Or,
            camera_direction: 0.0,
            camera_fov: -1.0,
            epsilon: 1.0 / PI,
        }
    }
}

/// Sweep one tile.
///
/// `(start_col, start_row)` is the causal observer's pixel in this tile's
/// local frame and may be negative or oversize when the observer lives in
/// another tile; only the in-tile portion of each ray is traced.
/// `view_height` is the observer's effective absolute height. `rays` is
/// the sorted (by theta) entering packet and must be empty exactly when
/// `direction` is `FromInside`.
///
/// Rays still alive at the boundary are gathered into a bundle keyed by
/// the side of the neighbor they enter next; `emit` is invoked at most
/// once, and only with a non-empty bundle.
///
/// For fixed inputs the sweep order and all floating-point operations are
/// fixed, so updates and bundles are bit-identical across retries.
#[allow(clippy::too_many_arguments)]
pub fn sweep_tile<F>(
    elevation: &Tile<f64>,
    visibility: &mut Tile<i32>,
    start_col: i64,
    start_row: i64,
    view_height: f64,
    direction: Direction,
    rays: &[Ray],
    params: &KernelParams,
    emit: F,
) where
    F: FnOnce(HashMap<Direction, Vec<Ray>>),
{
    let (rows, cols) = elevation.shape();
    if rows == 0 || cols == 0 {
        return;
    }
    if direction != Direction::FromInside && rays.is_empty() {
        return;
    }

    let mut sweep = Sweep {
        elevation,
        visibility,
        start_col,
        start_row,
        view_height,
        direction,
        rays,
        params,
        rows,
        cols,
        bundle: HashMap::new(),
    };

    if direction == Direction::FromInside
        && (0..cols as i64).contains(&start_col)
        && (0..rows as i64).contains(&start_row)
    {
        sweep.mark(start_row as usize, start_col as usize, true, 1.0);
    }

    // North and south boundary rows own the corners; west and east columns
    // cover the interior rows.
    for col in 0..cols as i64 {
        sweep.trace_to(col, 0, Direction::FromSouth);
        if rows > 1 {
            sweep.trace_to(col, rows as i64 - 1, Direction::FromNorth);
        }
    }
    for row in 1..rows.saturating_sub(1) as i64 {
        sweep.trace_to(0, row, Direction::FromEast);
        if cols > 1 {
            sweep.trace_to(cols as i64 - 1, row, Direction::FromWest);
        }
    }

    if !sweep.bundle.is_empty() {
        emit(sweep.bundle);
    }
}

struct Sweep<'a> {
    elevation: &'a Tile<f64>,
    visibility: &'a mut Tile<i32>,
    start_col: i64,
    start_row: i64,
    view_height: f64,
    direction: Direction,
    rays: &'a [Ray],
    params: &'a KernelParams,
    rows: usize,
    cols: usize,
    bundle: HashMap<Direction, Vec<Ray>>,
}

impl Sweep<'_> {
    fn mark(&mut self, row: usize, col: usize, visible: bool, intensity: f64) {
        // row/col are proven in-tile by the callers
        let current = unsafe { self.visibility.get_unchecked(row, col) };
        let next = self.params.operator.apply(current, visible, intensity);
        unsafe { self.visibility.set_unchecked(row, col, next) };
    }

    /// Trace the ray from the origin to one boundary pixel, tagged with
    /// the side of the neighbor it enters if it survives.
    fn trace_to(&mut self, target_col: i64, target_row: i64, exit: Direction) {
        let dx = (target_col - self.start_col) as f64;
        let dy = (self.start_row - target_row) as f64;
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let theta = dy.atan2(dx);

        if !in_fov(theta, self.params.camera_direction, self.params.camera_fov) {
            return;
        }

        // Clip to the tile and require the ray to actually enter through
        // the side the packet was addressed to, so that an observer
        // northwest of the tile never traces its FromNorth geometry out of
        // a FromWest packet.
        let clip = match clip_to_tile(
            self.start_col,
            self.start_row,
            target_col,
            target_row,
            self.cols,
            self.rows,
        ) {
            Some(clip) => clip,
            None => return,
        };
        match self.direction {
            Direction::FromInside => {
                if clip.entry_side.is_some() {
                    return;
                }
            }
            entered => match clip.entry_side {
                Some(side) if side == entered => {}
                _ => return,
            },
        }

        let (mut alpha_max, v0, seed_metric) = match self.direction {
            Direction::FromInside => (f64::NEG_INFINITY, 1.0, 0.0),
            _ => match nearest_ray(self.rays, theta, self.params.epsilon) {
                Some(ray) => (ray.alpha, ray.v0, ray.metric0),
                None => return,
            },
        };

        let steps = (target_col - self.start_col)
            .abs()
            .max((target_row - self.start_row).abs());
        let step_col = (target_col - self.start_col) as f64 / steps as f64;
        let step_row = (target_row - self.start_row) as f64 / steps as f64;
        let first = ((clip.t_entry * steps as f64).floor() as i64).max(1);

        let mut died = false;
        for s in first..=steps {
            let col = (self.start_col as f64 + step_col * s as f64).round() as i64;
            let row = (self.start_row as f64 + step_row * s as f64).round() as i64;
            if col < 0 || row < 0 || col >= self.cols as i64 || row >= self.rows as i64 {
                continue;
            }

            let dcol = (col - self.start_col) as f64;
            let drow = (row - self.start_row) as f64;
            let distance = self.params.resolution * (dcol * dcol + drow * drow).sqrt();
            if distance == 0.0 {
                continue;
            }
            if distance >= self.params.max_distance {
                died = true;
                break;
            }

            let z = unsafe { self.elevation.get_unchecked(row as usize, col as usize) };
            if z.is_nan() || self.elevation.is_nodata(z) {
                died = true;
                break;
            }

            let mut sighted = if self.params.altitude == f64::NEG_INFINITY {
                z
            } else {
                self.params.altitude
            };
            if self.params.curvature {
                sighted -= distance * distance / (2.0 * EARTH_RADIUS);
            }
            let alpha_cur = (sighted - self.view_height) / distance;

            // The entering alpha is a maximum over terrain up to the
            // matched ray's metric0; it cannot veto cells the ray had not
            // yet passed.
            let visible = alpha_cur >= alpha_max || distance <= seed_metric;
            self.mark(row as usize, col as usize, visible, v0);

            if alpha_cur > alpha_max {
                alpha_max = alpha_cur;
            }
        }

        // A target on the entry edge is the ray's first in-tile cell; its
        // continuation runs into this tile, not back where it came from.
        if self.direction != Direction::FromInside && exit == self.direction.opposite() {
            return;
        }

        if !died {
            let dcol = (target_col - self.start_col) as f64;
            let drow = (target_row - self.start_row) as f64;
            let exit_distance = self.params.resolution * (dcol * dcol + drow * drow).sqrt();
            if exit_distance < self.params.max_distance {
                self.bundle
                    .entry(exit)
                    .or_default()
                    .push(Ray::new(theta, alpha_max, v0, exit_distance));
            }
        }
    }
}

/// Shortest angular distance between two azimuths
fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

fn in_fov(theta: f64, camera_direction: f64, camera_fov: f64) -> bool {
    if camera_fov < 0.0 {
        return true;
    }
    angular_distance(theta, camera_direction) <= camera_fov / 2.0
}

/// Nearest entering ray by theta, within the angular tolerance.
///
/// `rays` is sorted by theta ascending; the seam between -pi and pi is
/// checked through the first and last elements.
fn nearest_ray<'a>(rays: &'a [Ray], theta: f64, epsilon: f64) -> Option<&'a Ray> {
    if rays.is_empty() {
        return None;
    }
    let split = rays.partition_point(|r| r.theta < theta);
    let candidates = [
        split.checked_sub(1),
        (split < rays.len()).then_some(split),
        Some(0),
        Some(rays.len() - 1),
    ];

    let mut best: Option<(&Ray, f64)> = None;
    for ray in candidates.into_iter().flatten().map(|i| &rays[i]) {
        let d = angular_distance(ray.theta, theta);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((ray, d));
        }
    }
    best.and_then(|(ray, d)| (d <= epsilon).then_some(ray))
}

struct Clip {
    /// Segment parameter in [0, 1] at which the ray enters the tile
    t_entry: f64,
    /// Side crossed at entry; `None` when the origin is inside
    entry_side: Option<Direction>,
}

/// Liang-Barsky clip of the origin->target segment against the tile
/// rectangle in cell-center space (`[-0.5, cols-0.5] x [-0.5, rows-0.5]`).
fn clip_to_tile(
    start_col: i64,
    start_row: i64,
    target_col: i64,
    target_row: i64,
    cols: usize,
    rows: usize,
) -> Option<Clip> {
    let x0 = start_col as f64;
    let y0 = start_row as f64;
    let dx = target_col as f64 - x0;
    let dy = target_row as f64 - y0;

    let xmin = -0.5;
    let xmax = cols as f64 - 0.5;
    let ymin = -0.5;
    let ymax = rows as f64 - 0.5;

    // (p, q, side crossed when this constraint bounds the entry). The row
    // axis grows south, so the ymin face is the north edge.
    let faces = [
        (-dx, x0 - xmin, Direction::FromWest),
        (dx, xmax - x0, Direction::FromEast),
        (-dy, y0 - ymin, Direction::FromNorth),
        (dy, ymax - y0, Direction::FromSouth),
    ];

    let mut t_entry = 0.0_f64;
    let mut t_exit = 1.0_f64;
    let mut entry_side = None;

    for (p, q, side) in faces {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t_entry {
                t_entry = t;
                entry_side = Some(side);
            }
        } else if t < t_exit {
            t_exit = t;
        }
    }

    if t_entry > t_exit {
        return None;
    }
    Some(Clip {
        t_entry,
        entry_side: (t_entry > 0.0).then_some(entry_side).flatten(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn flat_tile(rows: usize, cols: usize) -> Tile<f64> {
        Tile::filled(rows, cols, 0.0)
    }

    fn empty_visibility(rows: usize, cols: usize) -> Tile<i32> {
        let mut vis = Tile::filled(rows, cols, crate::operator::VISIBILITY_NODATA);
        vis.set_nodata(Some(crate::operator::VISIBILITY_NODATA));
        vis
    }

    fn flat_params() -> KernelParams {
        KernelParams {
            curvature: false,
            ..KernelParams::default()
        }
    }

    #[test]
    fn test_flat_tile_fully_visible_from_inside() {
        let dem = flat_tile(33, 33);
        let mut vis = empty_visibility(33, 33);
        let mut bundle = None;
        sweep_tile(
            &dem,
            &mut vis,
            16,
            16,
            2.0,
            Direction::FromInside,
            &[],
            &flat_params(),
            |b| bundle = Some(b),
        );

        for row in 0..33 {
            for col in 0..33 {
                assert_eq!(vis.get(row, col).unwrap(), 1, "cell ({row}, {col})");
            }
        }

        // rays leave through all four sides
        let bundle = bundle.unwrap();
        for d in Direction::EDGES {
            assert!(!bundle[&d].is_empty(), "no rays toward {d:?}");
        }
    }

    #[test]
    fn test_wall_shadows_cells_behind() {
        let mut dem = flat_tile(21, 21);
        for row in 0..21 {
            dem.set(row, 13, 1000.0).unwrap();
        }
        let mut vis = empty_visibility(21, 21);
        sweep_tile(
            &dem,
            &mut vis,
            5,
            10,
            2.0,
            Direction::FromInside,
            &[],
            &flat_params(),
            |_| {},
        );

        assert_eq!(vis.get(10, 8).unwrap(), 1, "before the wall");
        assert_eq!(vis.get(10, 13).unwrap(), 1, "the wall itself");
        assert_eq!(vis.get(10, 18).unwrap(), 0, "behind the wall");
    }

    #[test]
    fn test_max_distance_bounds_rays() {
        let dem = flat_tile(41, 41);
        let mut vis = empty_visibility(41, 41);
        let mut emitted = false;
        let params = KernelParams {
            max_distance: 10.0,
            ..flat_params()
        };
        sweep_tile(
            &dem,
            &mut vis,
            20,
            20,
            2.0,
            Direction::FromInside,
            &[],
            &params,
            |_| emitted = true,
        );

        assert_eq!(vis.get(20, 25).unwrap(), 1);
        assert!(
            vis.is_nodata_at(20, 35).unwrap(),
            "cells past max distance stay untouched"
        );
        assert!(!emitted, "no ray survives to the boundary");
    }

    #[test]
    fn test_zero_fov_marks_only_the_axis() {
        let dem = flat_tile(21, 21);
        let mut vis = empty_visibility(21, 21);
        let params = KernelParams {
            camera_direction: 0.0,
            camera_fov: 0.0,
            ..flat_params()
        };
        sweep_tile(
            &dem,
            &mut vis,
            10,
            10,
            2.0,
            Direction::FromInside,
            &[],
            &params,
            |_| {},
        );

        for col in 11..21 {
            assert_eq!(vis.get(10, col).unwrap(), 1, "axis cell {col}");
        }
        for row in 0..21 {
            for col in 0..21 {
                if row != 10 {
                    assert!(
                        vis.is_nodata_at(row, col).unwrap(),
                        "off-axis cell ({row}, {col})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_entering_rays_continue_the_sweep() {
        let dem = flat_tile(16, 16);
        let mut vis = empty_visibility(16, 16);
        // observer 8 cells west of the tile, on row 8, with an unobstructed
        // horizon so far; entering thetas match the west-column entry angles
        let entering: Vec<Ray> = (0..16)
            .map(|row| {
                let dy = 8.0 - row as f64;
                let theta = dy.atan2(8.0);
                Ray::new(theta, -2.0 / 8.0, 1.0, 8.0)
            })
            .rev()
            .collect();
        let mut bundle = None;
        sweep_tile(
            &dem,
            &mut vis,
            -8,
            8,
            2.0,
            Direction::FromWest,
            &entering,
            &flat_params(),
            |b| bundle = Some(b),
        );

        // the row straight ahead keeps rising above the entry alpha
        for col in 0..16 {
            assert_eq!(vis.get(8, col).unwrap(), 1, "cell (8, {col})");
        }
        // surviving rays leave through the east side
        let bundle = bundle.unwrap();
        assert!(!bundle[&Direction::FromWest].is_empty());
    }

    #[test]
    fn test_entering_packet_respects_entry_side() {
        let dem = flat_tile(16, 16);
        let mut vis = empty_visibility(16, 16);
        // observer due west: a FromNorth packet must trace nothing
        let entering = [Ray::new(0.0, -0.1, 1.0, 8.0)];
        let mut emitted = false;
        sweep_tile(
            &dem,
            &mut vis,
            -8,
            8,
            2.0,
            Direction::FromNorth,
            &entering,
            &flat_params(),
            |_| emitted = true,
        );
        assert_eq!(vis.valid_count(), 0);
        assert!(!emitted);
    }

    #[test]
    fn test_angular_distance_wraps() {
        assert!(angular_distance(PI - 0.01, -PI + 0.01) < 0.03);
        assert!((angular_distance(0.0, FRAC_PI_2) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_ray_matching() {
        let rays = [
            Ray::new(-1.0, 0.1, 1.0, 0.0),
            Ray::new(0.0, 0.2, 1.0, 0.0),
            Ray::new(1.0, 0.3, 1.0, 0.0),
        ];
        assert_eq!(nearest_ray(&rays, 0.05, 0.3).unwrap().alpha, 0.2);
        assert_eq!(nearest_ray(&rays, 0.9, 0.3).unwrap().alpha, 0.3);
        assert!(nearest_ray(&rays, 2.0, 0.3).is_none());
        assert!(nearest_ray(&[], 0.0, 0.3).is_none());
    }

    #[test]
    fn test_nearest_ray_wraps_the_seam() {
        let rays = [
            Ray::new(-PI + 0.01, 0.5, 1.0, 0.0),
            Ray::new(0.0, 0.2, 1.0, 0.0),
        ];
        // just below +pi matches the ray just above -pi
        assert_eq!(nearest_ray(&rays, PI - 0.01, 0.1).unwrap().alpha, 0.5);
    }

    #[test]
    fn test_clip_inside_origin() {
        let clip = clip_to_tile(8, 8, 15, 0, 16, 16).unwrap();
        assert_eq!(clip.t_entry, 0.0);
        assert!(clip.entry_side.is_none());
    }

    #[test]
    fn test_clip_entry_sides() {
        let clip = clip_to_tile(-8, 8, 15, 8, 16, 16).unwrap();
        assert_eq!(clip.entry_side, Some(Direction::FromWest));
        assert!(clip.t_entry > 0.0);

        let clip = clip_to_tile(8, -8, 8, 15, 16, 16).unwrap();
        assert_eq!(clip.entry_side, Some(Direction::FromNorth));

        let clip = clip_to_tile(8, 24, 8, 0, 16, 16).unwrap();
        assert_eq!(clip.entry_side, Some(Direction::FromSouth));

        let clip = clip_to_tile(24, 8, 0, 8, 16, 16).unwrap();
        assert_eq!(clip.entry_side, Some(Direction::FromEast));
    }

    #[test]
    fn test_clip_miss() {
        // segment running along outside the rectangle
        assert!(clip_to_tile(-3, -3, 20, -3, 16, 16).is_none());
    }
}
