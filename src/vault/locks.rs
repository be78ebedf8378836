use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::hash::ContentHash;

/// Per-hash async mutexes.
///
/// Every operation that reads a reference count and then acts on the blob,
/// or inserts a record for a hash, holds the lock for that hash. Entries are
/// created on demand and dropped once nobody holds or awaits them.
#[derive(Default)]
pub struct HashLocks {
    slots: Mutex<HashMap<ContentHash, Arc<AsyncMutex<()>>>>,
}

pub struct HashLockGuard<'a> {
    locks: &'a HashLocks,
    hash: ContentHash,
    _guard: OwnedMutexGuard<()>,
}

impl HashLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, hash: &ContentHash) -> HashLockGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(hash.clone()).or_default())
        };
        let guard = slot.lock_owned().await;
        HashLockGuard {
            locks: self,
            hash: hash.clone(),
            _guard: guard,
        }
    }

    /// Number of hashes with a live lock slot.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for HashLockGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Two strong refs left: the map's and the one inside our own guard.
        // Waiters clone under the map lock, so none can appear concurrently.
        if slots
            .get(&self.hash)
            .is_some_and(|slot| Arc::strong_count(slot) == 2)
        {
            slots.remove(&self.hash);
        }
    }
}
