//! # tileshed-runtime
//!
//! Substrate adapters for the tileshed viewshed engine.
//!
//! The engine is written against abstract data-parallel primitives so that
//! any shuffle/broadcast/reduce substrate can host it. This crate defines
//! those interfaces and ships the bundled in-process implementation:
//! - `PartitionedDataset`: keyed dataset with map/flat_map transforms
//! - `Broadcast`: one-writer many-reader read-only snapshot
//! - `Accumulator`: concurrency-safe append-only buffer
//! - `LayerReader`/`LayerWriter`: boundary I/O for tiled layers
//! - `InMemoryDataset`: rayon-backed reference substrate

pub mod accumulator;
pub mod broadcast;
pub mod dataset;
pub mod storage;

pub use accumulator::{Accumulator, BufferAccumulator};
pub use broadcast::Broadcast;
pub use dataset::{
    InMemoryDataset, PartitionedDataset, ProcessingMode, RuntimeContext, StorageLevel,
};
pub use storage::{InMemoryLayerStore, LayerId, LayerReader, LayerWriter, StoredLayer};
