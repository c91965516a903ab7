//! Per-drone exclusive locks.
//!
//! A load is a read-check-write sequence across several repository calls. The
//! lock for a drone is held for the whole sequence so concurrent requests for
//! the same drone observe a linear order. Different drones never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct DroneLocks {
    // Only drones with a holder or a waiter have an entry.
    inner: DashMap<i64, Arc<Mutex<()>>>,
}

impl DroneLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `drone_id`. Released when the guard drops.
    pub async fn acquire(&self, drone_id: i64) -> DroneLockGuard<'_> {
        // Clone the Arc out before awaiting so the shard lock is not held across the await.
        let mutex = self.inner.entry(drone_id).or_default().value().clone();
        let guard = mutex.lock_owned().await;
        DroneLockGuard { locks: self, drone_id, guard: Some(guard) }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Exclusive access to one drone. Dropping it releases the lock and removes
/// the table entry when nobody else is waiting for it.
#[must_use]
pub struct DroneLockGuard<'a> {
    locks: &'a DroneLocks,
    drone_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DroneLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the Arc under the shard lock, so a count of one means
        // the map holds the only reference.
        self.locks
            .inner
            .remove_if(&self.drone_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
