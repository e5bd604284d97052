//! Iteration driver: seed observers, propagate ray packets to quiescence
//!
//! Iteration 0 runs the kernel at every observer's host tile. Each later
//! iteration drains the ray packet bus, groups the packets by target tile,
//! broadcasts the grouping, and applies the kernel across every addressed
//! tile; the loop ends the first time the bus comes back empty. Because
//! each packet batch is a pure function of the previous iteration's state,
//! retried tasks at worst re-add duplicates, which the idempotent default
//! operator absorbs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::f64::consts::PI;
use std::sync::Arc;
use tileshed_core::{
    CellType, Error, KeyBounds, LayerMetadata, Result, Tile, TileKey, TileLayer,
};
use tileshed_runtime::{
    Accumulator, BufferAccumulator, InMemoryDataset, PartitionedDataset, RuntimeContext,
    StorageLevel,
};
use tracing::{debug, info, warn};

use crate::kernel::{sweep_tile, KernelParams};
use crate::observer::{self, Point6D, PointInfo};
use crate::operator::{AggregationOperator, VISIBILITY_NODATA};
use crate::ray::{Direction, Message, Ray};
use crate::resolution::layer_resolution;

/// The engine's ray packet bus
pub type RayPacketBus = BufferAccumulator<Message>;

/// Elevation tile plus the visibility tile under construction
pub type TilePair = (Arc<Tile<f64>>, Tile<i32>);

/// Parameters of one viewshed invocation.
#[derive(Debug, Clone)]
pub struct ViewshedParams {
    /// Maximum metric ray length in meters
    pub max_distance: f64,
    /// Account for Earth curvature
    pub curvature: bool,
    /// Per-pixel aggregation
    pub operator: AggregationOperator,
    /// Angular tolerance for matching entering rays by theta
    pub epsilon: f64,
    /// Ground resolution override in meters per pixel; estimated from the
    /// layer CRS when absent
    pub resolution: Option<f64>,
}

impl Default for ViewshedParams {
    fn default() -> Self {
        Self {
            max_distance: f64::INFINITY,
            curvature: true,
            operator: AggregationOperator::Or,
            epsilon: 1.0 / PI,
            resolution: None,
        }
    }
}

/// Compute the viewshed of `points` over a tiled elevation layer.
///
/// Returns a visibility layer of identical shape whose metadata inherits
/// the elevation layout, extent, CRS and bounds, with an
/// integer-with-nodata cell type. `touched_keys`, when supplied,
/// accumulates every tile key the computation ever addressed.
pub fn viewshed(
    elevation: &TileLayer<f64>,
    points: &[Point6D],
    params: ViewshedParams,
    touched_keys: Option<&mut HashSet<TileKey>>,
) -> Result<TileLayer<i32>> {
    let ctx = RuntimeContext::default();
    let pairs: Vec<(TileKey, Tile<f64>)> =
        elevation.iter().map(|(key, tile)| (key, tile.clone())).collect();
    let dataset = InMemoryDataset::from_pairs(&ctx, pairs);
    let bus = RayPacketBus::new();
    run(
        dataset,
        elevation.metadata().clone(),
        points,
        params,
        &bus,
        touched_keys,
    )
}

/// Translate an observer's global pixel address into a tile's local frame.
///
/// The result may be negative or oversize; the kernel traces only the
/// in-tile portion of each ray.
pub(crate) fn translate_origin(
    info: &PointInfo,
    key: TileKey,
    tile_cols: usize,
    tile_rows: usize,
) -> (i64, i64) {
    let start_col = (info.key.col - key.col) as i64 * tile_cols as i64 + info.col as i64;
    let start_row = (info.key.row - key.row) as i64 * tile_rows as i64 + info.row as i64;
    (start_col, start_row)
}

fn kernel_params(info: &PointInfo, params: &ViewshedParams, resolution: f64) -> KernelParams {
    KernelParams {
        resolution,
        max_distance: params.max_distance,
        curvature: params.curvature,
        altitude: info.alt,
        operator: params.operator,
        camera_direction: info.angle,
        camera_fov: info.fov,
        epsilon: params.epsilon,
    }
}

/// Route a kernel bundle onto the bus, one message per side, dropping
/// targets outside the layer bounds.
fn route<A: Accumulator<Message>>(
    bus: &A,
    key: TileKey,
    observer_index: u32,
    bounds: &KeyBounds,
    bundle: HashMap<Direction, Vec<Ray>>,
) {
    for (direction, rays) in bundle {
        if rays.is_empty() {
            continue;
        }
        if let Some(target_key) = direction.neighbor_of(key) {
            if bounds.contains(target_key) {
                bus.add(Message {
                    target_key,
                    observer_index,
                    direction,
                    rays,
                });
            }
        }
    }
}

/// Packets of one iteration grouped by target tile, then by causal
/// observer (ascending), then by entry direction.
type Changes = HashMap<TileKey, BTreeMap<u32, HashMap<Direction, Vec<Ray>>>>;

/// Run the engine over an already-partitioned elevation dataset.
///
/// Generic over the substrate and the bus so that any data-parallel
/// runtime can host the iteration; `viewshed` instantiates it with the
/// bundled in-memory substrate.
pub(crate) fn run<D, P, A>(
    elevation: D,
    metadata: LayerMetadata,
    points: &[Point6D],
    params: ViewshedParams,
    bus: &A,
    mut touched_keys: Option<&mut HashSet<TileKey>>,
) -> Result<TileLayer<i32>>
where
    D: PartitionedDataset<TileKey, Tile<f64>, Context = RuntimeContext, Output<TileKey, TilePair> = P>,
    P: PartitionedDataset<TileKey, TilePair, Context = RuntimeContext, Output<TileKey, TilePair> = P>,
    A: Accumulator<Message>,
{
    metadata.validate()?;
    if elevation.count() == 0 {
        return Err(Error::InvalidLayer {
            reason: "layer has no tiles".to_string(),
        });
    }

    let resolution = match params.resolution {
        Some(r) => r,
        None => layer_resolution(&metadata)?,
    };

    let infos = observer::resolve_observers(&metadata, points)?;
    let ctx = elevation.context().clone();
    let bounds = metadata.bounds;
    let (tile_cols, tile_rows) = (metadata.layout.tile_cols, metadata.layout.tile_rows);

    let by_key = observer::group_by_key(&infos);
    let by_index = observer::index_table(&infos)?;
    let heights = observer::effective_heights(&elevation, &by_key)?;

    for info in &infos {
        match heights.get(&info.index) {
            None => return Err(Error::ObserverUnknownIndex { index: info.index }),
            Some(h) if h.is_nan() => {
                return Err(Error::InvalidParameter {
                    name: "points",
                    reason: format!("observer {} stands on a no-data cell", info.index),
                })
            }
            _ => {}
        }
    }

    if let Some(tk) = touched_keys.as_mut() {
        tk.extend(infos.iter().map(|info| info.key));
    }

    let by_key_bc = ctx.broadcast(by_key);
    let by_index_bc = ctx.broadcast(by_index);
    let heights_bc = ctx.broadcast(heights);

    debug!(
        observers = infos.len(),
        resolution, "seeding observers at their host tiles"
    );

    // iteration 0: every observer sweeps its own tile
    let mut sheds: P = elevation.map(|key, tile| {
        let tile = Arc::new(tile.clone());
        let mut vis = Tile::filled(tile_rows, tile_cols, VISIBILITY_NODATA);
        vis.set_nodata(Some(VISIBILITY_NODATA));
        if let Some(hosted) = by_key_bc.get(key) {
            for info in hosted {
                let Some(height) = heights_bc.get(&info.index).copied() else {
                    continue;
                };
                sweep_tile(
                    &tile,
                    &mut vis,
                    info.col as i64,
                    info.row as i64,
                    height,
                    Direction::FromInside,
                    &[],
                    &kernel_params(info, &params, resolution),
                    |bundle| route(bus, *key, info.index, &bounds, bundle),
                );
            }
        }
        (tile, vis)
    })?;
    sheds.persist(StorageLevel::Memory);

    let mut iteration = 0usize;
    loop {
        let messages = bus.value();
        bus.reset();
        if messages.is_empty() {
            break;
        }
        iteration += 1;

        let mut changes: Changes = HashMap::new();
        for message in messages {
            changes
                .entry(message.target_key)
                .or_default()
                .entry(message.observer_index)
                .or_default()
                .entry(message.direction)
                .or_default()
                .extend(message.rays);
        }
        if let Some(tk) = touched_keys.as_mut() {
            tk.extend(changes.keys().copied());
        }

        debug!(iteration, addressed_tiles = changes.len(), "applying ray packets");
        let changes_bc = ctx.broadcast(changes);

        let next: P = sheds.map(|key, (tile, vis)| {
            let tile = Arc::clone(tile);
            let mut vis = vis.clone();
            if let Some(entry) = changes_bc.get(key) {
                for (index, packets) in entry {
                    let Some(info) = by_index_bc.get(index) else {
                        warn!(index = *index, "packet for unknown observer index dropped");
                        continue;
                    };
                    let Some(height) = heights_bc.get(index).copied() else {
                        continue;
                    };
                    let (start_col, start_row) =
                        translate_origin(info, *key, tile_cols, tile_rows);
                    for direction in Direction::EDGES {
                        if let Some(rays) = packets.get(&direction) {
                            let mut sorted = rays.clone();
                            sorted.sort_by(|a, b| a.theta.total_cmp(&b.theta));
                            sweep_tile(
                                &tile,
                                &mut vis,
                                start_col,
                                start_row,
                                height,
                                direction,
                                &sorted,
                                &kernel_params(info, &params, resolution),
                                |bundle| route(bus, *key, *index, &bounds, bundle),
                            );
                        }
                    }
                }
            }
            (tile, vis)
        })?;
        next.persist(StorageLevel::Memory);
        sheds.unpersist();
        sheds = next;
    }

    info!(
        iterations = iteration,
        observers = infos.len(),
        "viewshed reached quiescence"
    );

    let tiles = sheds
        .collect()?
        .into_iter()
        .map(|(key, (_, vis))| (key, vis))
        .collect();
    let out_metadata = LayerMetadata {
        cell_type: CellType::I32 {
            nodata: VISIBILITY_NODATA,
        },
        layout: metadata.layout,
        crs: metadata.crs,
        bounds: metadata.bounds,
    };
    Ok(TileLayer::from_tiles(tiles, out_metadata))
}
