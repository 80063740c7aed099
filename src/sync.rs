use std::{
    hash::Hash,
    sync::{Arc, Mutex, PoisonError},
};

use dashmap::DashMap;

/// One mutex per key, created on first use and dropped again once nobody
/// holds or waits for it.
///
/// Only the key's shard is locked while looking up its mutex, so callers
/// working on different keys never wait on each other.
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    /// Runs `critical_section` while holding the mutex for `key`.
    pub fn with_lock<T>(&self, key: K, critical_section: impl FnOnce() -> T) -> T {
        // the shard guard must be gone before waiting on the key's mutex
        let lock = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        let result = {
            // the guarded value carries no state, so poisoning is ignored
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            critical_section()
        };
        // one reference in the map plus ours: nobody else is queued on it
        self.locks.remove_if(&key, |_, held| Arc::strong_count(held) == 2);
        result
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}
