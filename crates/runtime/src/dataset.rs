//! Partitioned datasets and the rayon-backed in-memory substrate

use crate::broadcast::Broadcast;
use rayon::prelude::*;
use tileshed_core::{Error, Result};
use tracing::debug;

/// Persistence tier hint for a dataset.
///
/// The in-memory substrate holds everything resident and treats the hint
/// as advisory; cluster substrates map it to their own storage tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageLevel {
    #[default]
    None,
    Memory,
    MemoryAndDisk,
}

/// Processing mode for dataset transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

/// Execution context of the in-process substrate.
///
/// Owns the processing mode and hands out broadcast snapshots.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    pub mode: ProcessingMode,
}

impl RuntimeContext {
    pub fn new(mode: ProcessingMode) -> Self {
        Self { mode }
    }

    /// Publish a read-only snapshot visible to every task
    pub fn broadcast<T>(&self, value: T) -> Broadcast<T> {
        Broadcast::new(value)
    }
}

/// A keyed dataset distributed over the substrate's partitions.
///
/// The engine only ever touches datasets through this trait; any
/// shuffle/broadcast/reduce substrate can stand behind it. Transforms
/// return `Self::Output` so a substrate's datasets stay within that
/// substrate. `collect` is the materialization point for the driver's
/// broadcast tables.
pub trait PartitionedDataset<K, V>: Sized
where
    K: Send + Sync,
    V: Send + Sync,
{
    /// Dataset type produced by transforms on this substrate
    type Output<K2: Send + Sync, V2: Send + Sync>: PartitionedDataset<K2, V2>;
    /// Substrate execution context
    type Context;

    /// Transform every value, keeping keys
    fn map<V2, F>(&self, f: F) -> Result<Self::Output<K, V2>>
    where
        K: Clone,
        V2: Send + Sync,
        F: Fn(&K, &V) -> V2 + Send + Sync;

    /// Transform every pair into zero or more new pairs
    fn flat_map<K2, V2, F, I>(&self, f: F) -> Result<Self::Output<K2, V2>>
    where
        K2: Send + Sync,
        V2: Send + Sync,
        I: IntoIterator<Item = (K2, V2)>,
        F: Fn(&K, &V) -> I + Send + Sync;

    /// Any one pair of the dataset, if non-empty
    fn first(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone;

    /// Materialize the full dataset on the driver
    fn collect(&self) -> Result<Vec<(K, V)>>
    where
        K: Clone,
        V: Clone;

    /// Number of pairs
    fn count(&self) -> usize;

    /// Hint the substrate to keep this dataset resident
    fn persist(&self, level: StorageLevel);

    /// Release a persisted dataset
    fn unpersist(&self);

    /// The substrate context this dataset belongs to
    fn context(&self) -> &Self::Context;
}

/// Reference substrate: a keyed vector processed with rayon.
///
/// Transforms are eager; `persist`/`unpersist` only log. Substrate faults
/// (thread-pool construction) surface as `SubstrateFailure`.
#[derive(Debug, Clone)]
pub struct InMemoryDataset<K, V> {
    pairs: Vec<(K, V)>,
    ctx: RuntimeContext,
}

impl<K, V> InMemoryDataset<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
{
    pub fn from_pairs(ctx: &RuntimeContext, pairs: Vec<(K, V)>) -> Self {
        Self {
            pairs,
            ctx: ctx.clone(),
        }
    }

    fn run<R, F>(&self, f: F) -> Result<R>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self.ctx.mode {
            ProcessingMode::Sequential | ProcessingMode::Parallel => Ok(f()),
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::SubstrateFailure {
                        detail: format!("thread pool: {e}"),
                    })?;
                Ok(pool.install(f))
            }
        }
    }
}

impl<K, V> PartitionedDataset<K, V> for InMemoryDataset<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
{
    type Output<K2: Send + Sync, V2: Send + Sync> = InMemoryDataset<K2, V2>;
    type Context = RuntimeContext;

    fn map<V2, F>(&self, f: F) -> Result<InMemoryDataset<K, V2>>
    where
        K: Clone,
        V2: Send + Sync,
        F: Fn(&K, &V) -> V2 + Send + Sync,
    {
        let sequential = self.ctx.mode == ProcessingMode::Sequential;
        let pairs = self.run(|| {
            if sequential {
                self.pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), f(k, v)))
                    .collect()
            } else {
                self.pairs
                    .par_iter()
                    .map(|(k, v)| (k.clone(), f(k, v)))
                    .collect()
            }
        })?;
        Ok(InMemoryDataset {
            pairs,
            ctx: self.ctx.clone(),
        })
    }

    fn flat_map<K2, V2, F, I>(&self, f: F) -> Result<InMemoryDataset<K2, V2>>
    where
        K2: Send + Sync,
        V2: Send + Sync,
        I: IntoIterator<Item = (K2, V2)>,
        F: Fn(&K, &V) -> I + Send + Sync,
    {
        let sequential = self.ctx.mode == ProcessingMode::Sequential;
        let nested: Vec<Vec<(K2, V2)>> = self.run(|| {
            if sequential {
                self.pairs
                    .iter()
                    .map(|(k, v)| f(k, v).into_iter().collect())
                    .collect()
            } else {
                self.pairs
                    .par_iter()
                    .map(|(k, v)| f(k, v).into_iter().collect())
                    .collect()
            }
        })?;
        Ok(InMemoryDataset {
            pairs: nested.into_iter().flatten().collect(),
            ctx: self.ctx.clone(),
        })
    }

    fn first(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.pairs.first().cloned()
    }

    fn collect(&self) -> Result<Vec<(K, V)>>
    where
        K: Clone,
        V: Clone,
    {
        Ok(self.pairs.clone())
    }

    fn count(&self) -> usize {
        self.pairs.len()
    }

    fn persist(&self, level: StorageLevel) {
        debug!(?level, pairs = self.pairs.len(), "persist (in-memory, advisory)");
    }

    fn unpersist(&self) {
        debug!(pairs = self.pairs.len(), "unpersist (in-memory, advisory)");
    }

    fn context(&self) -> &RuntimeContext {
        &self.ctx
    }
}
