//! Read-only broadcast snapshots

use std::ops::Deref;
use std::sync::Arc;

/// A one-writer, many-reader snapshot shared with every task of an
/// iteration.
///
/// The value is fixed at creation and consistent for as long as the handle
/// lives; tasks receive cheap clones of the handle, never of the value.
#[derive(Debug)]
pub struct Broadcast<T> {
    value: Arc<T>,
}

impl<T> Broadcast<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Clone for Broadcast<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Deref for Broadcast<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
