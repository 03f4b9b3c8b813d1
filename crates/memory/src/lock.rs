// SPDX-License-Identifier: Apache-2.0

//! Per-device reentrant write locks with timeout.
//!
//! Writes to one device are serialized; reads go through the stores' own
//! guarantees and never take these locks.

use crate::error::Error;
use parking_lot::lock_api::ArcReentrantMutexGuard;
use parking_lot::{Mutex, RawMutex, RawThreadId, ReentrantMutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Guard for a held device lock; the lock is released on drop.
///
/// Reacquiring the same device's lock from the holding thread succeeds, so a
/// thread may stack guards.
pub type DeviceLockGuard = ArcReentrantMutexGuard<RawMutex, RawThreadId, ()>;

/// Lazily creates one reentrant lock per device suffix.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<ReentrantMutex<()>>>>,
}

impl LockManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, dev: &str) -> Arc<ReentrantMutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(dev.to_string())
            .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
            .clone()
    }

    /// Acquires the lock for `dev`, blocking up to `timeout`.
    pub fn acquire(&self, dev: &str, timeout: Duration) -> Result<DeviceLockGuard, Error> {
        let lock = self.lock_for(dev);
        lock.try_lock_arc_for(timeout).ok_or_else(|| Error::LockTimeout {
            device: dev.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const TIMEOUT: Duration = Duration::from_millis(50);

    #[test]
    fn same_thread_reacquisition_is_reentrant() {
        let locks = LockManager::new();
        let outer = locks.acquire("DM", TIMEOUT).unwrap();
        let inner = locks.acquire("DM", TIMEOUT).unwrap();
        drop(inner);
        drop(outer);
    }

    #[test]
    fn contended_acquire_times_out() {
        let locks = Arc::new(LockManager::new());
        let guard = locks.acquire("DM", TIMEOUT).unwrap();
        let contender = locks.clone();
        let result = thread::spawn(move || contender.acquire("DM", TIMEOUT).map(|_| ()))
            .join()
            .unwrap();
        assert!(matches!(result, Err(Error::LockTimeout { .. })));
        drop(guard);
    }

    #[test]
    fn distinct_devices_do_not_contend() {
        let locks = Arc::new(LockManager::new());
        let _dm = locks.acquire("DM", TIMEOUT).unwrap();
        let other = locks.clone();
        let result = thread::spawn(move || other.acquire("MR", TIMEOUT).map(|_| ()))
            .join()
            .unwrap();
        assert!(result.is_ok());
    }
}
