//! Append-only accumulators shared across tile tasks

use std::sync::Mutex;
use std::sync::PoisonError;

/// Contract of the engine's global append-only buffer.
///
/// `add` must be safe under many concurrent tile tasks, and the buffer
/// must tolerate duplicate additions (a retried task may add its items
/// twice). Insertion order is not preserved. `reset` is called only by the
/// driver between iterations; `merge` folds in a buffer drained from
/// another worker when the substrate partitions accumulator state.
pub trait Accumulator<E: Clone>: Send + Sync {
    /// Append one item; safe to call concurrently
    fn add(&self, item: E);

    /// All items added since the last `reset`
    fn value(&self) -> Vec<E>;

    /// Clear the buffer
    fn reset(&self);

    /// Fold another buffer's contents into this one
    fn merge(&self, other: Vec<E>);
}

/// In-process accumulator over a mutex-guarded vector.
#[derive(Debug, Default)]
pub struct BufferAccumulator<E> {
    items: Mutex<Vec<E>>,
}

impl<E> BufferAccumulator<E> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Vec<E>> {
        // A task that panicked mid-add leaves at worst a duplicate, which
        // the downstream semantics absorb.
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Clone + Send + Sync> Accumulator<E> for BufferAccumulator<E> {
    fn add(&self, item: E) {
        self.guard().push(item);
    }

    fn value(&self) -> Vec<E> {
        self.guard().clone()
    }

    fn reset(&self) {
        self.guard().clear();
    }

    fn merge(&self, mut other: Vec<E>) {
        self.guard().append(&mut other);
    }
}
