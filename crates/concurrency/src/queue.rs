//! Serialized per-store access queue
//!
//! Every store owns one [`SerialQueue`] wrapping its backend session. All
//! schema, CRUD and query operations run as closures through
//! [`SerialQueue::run`], strictly one at a time.
//!
//! The queue is a `parking_lot::FairMutex`: when an operation finishes, the
//! lock is handed directly to the longest-waiting caller, so operations
//! execute in arrival order. Callers block until their operation has fully
//! completed (committed or failed).
//!
//! Closing the queue takes the resource out; later operations fail with
//! `StoreClosed`.

use parking_lot::FairMutex;
use smartstore_core::{StoreError, StoreResult};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// Queue metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Operations waiting for or holding the queue
    pub in_flight: usize,
    /// Operations that returned `Ok`
    pub completed: u64,
    /// Operations that returned `Err`
    pub failed: u64,
}

/// Single-file access to one resource
pub struct SerialQueue<T> {
    name: String,
    slot: FairMutex<Option<T>>,
    in_flight: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl<T> SerialQueue<T> {
    /// Create a queue owning `resource`
    pub fn new(name: impl Into<String>, resource: T) -> Self {
        SerialQueue {
            name: name.into(),
            slot: FairMutex::new(Some(resource)),
            in_flight: AtomicUsize::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Queue name (the store name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `op` with exclusive access to the resource.
    ///
    /// Blocks until every earlier operation has finished.
    pub fn run<R>(&self, op: impl FnOnce(&mut T) -> StoreResult<R>) -> StoreResult<R> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let result = {
            let mut guard = self.slot.lock();
            match guard.as_mut() {
                Some(resource) => op(resource),
                None => Err(StoreError::StoreClosed {
                    store: self.name.clone(),
                }),
            }
        };
        self.in_flight.fetch_sub(1, Ordering::AcqRel);

        match &result {
            Ok(_) => self.completed.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    /// Wait for running work, then take the resource out.
    ///
    /// Returns `None` if the queue was already closed.
    pub fn close(&self) -> Option<T> {
        let resource = self.slot.lock().take();
        if resource.is_some() {
            debug!(target: "smartstore::queue", queue = %self.name, "Queue closed");
        }
        resource
    }

    /// Whether [`close`](Self::close) has run
    pub fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Current metrics
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            in_flight: self.in_flight.load(Ordering::Acquire),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl<T> std::fmt::Debug for SerialQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.name)
            .field("stats", &self.stats())
            .finish()
    }
}
