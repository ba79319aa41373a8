//! Synchronization primitives bounding and deduplicating calls to the weather provider

use std::{
    collections::HashSet,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counting semaphore limiting the number of simultaneous fetches.
#[derive(Debug)]
pub(crate) struct FetchGate {
    available: Mutex<usize>,
    released: Condvar,
}

/// A slot of the [`FetchGate`], given back on drop.
pub(crate) struct FetchPermit<'g> {
    gate: &'g FetchGate,
}

impl FetchGate {
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits.max(1)),
            released: Condvar::new(),
        }
    }

    /// Blocks until a slot is free.
    pub(crate) fn acquire(&self) -> FetchPermit<'_> {
        let mut available = lock(&self.available);
        while *available == 0 {
            available = self
                .released
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;
        FetchPermit { gate: self }
    }
}

impl Drop for FetchPermit<'_> {
    fn drop(&mut self) {
        *lock(&self.gate.available) += 1;
        self.gate.released.notify_one();
    }
}

/// Keys currently being fetched. Concurrent requesters of the same key wait for the first one
/// instead of issuing a second fetch.
#[derive(Debug, Default)]
pub(crate) struct PendingKeys {
    keys: Mutex<HashSet<String>>,
    finished: Condvar,
}

/// Ownership of a pending key; the key is released on drop, whatever the outcome of the fetch.
pub(crate) struct PendingClaim<'p> {
    pending: &'p PendingKeys,
    key: String,
}

impl PendingKeys {
    /// Claims `key` for the caller. If another thread holds the claim, waits until it is released
    /// and returns `None`; the caller is then expected to look the key up again.
    pub(crate) fn claim(&self, key: &str) -> Option<PendingClaim<'_>> {
        let mut keys = lock(&self.keys);
        if keys.insert(key.to_string()) {
            return Some(PendingClaim {
                pending: self,
                key: key.to_string(),
            });
        }
        while keys.contains(key) {
            keys = self
                .finished
                .wait(keys)
                .unwrap_or_else(PoisonError::into_inner);
        }
        None
    }
}

impl Drop for PendingClaim<'_> {
    fn drop(&mut self) {
        lock(&self.pending.keys).remove(&self.key);
        self.pending.finished.notify_all();
    }
}
