// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of per-resource locks with explicit eviction.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Lazily created locks keyed by [`ResourceId::key`](rop_core::ResourceId::key).
///
/// A lock is idle when the registry holds the only reference to it; only
/// idle locks are evicted, so a holder is never split from its waiters.
pub struct KeyedLocks<L> {
    locks: Mutex<HashMap<String, Arc<L>>>,
}

impl<L: Default> KeyedLocks<L> {
    pub fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    /// Lock for `key`, created on first use.
    pub fn get(&self, key: &str) -> Arc<L> {
        Arc::clone(self.locks.lock().entry(key.to_string()).or_default())
    }

    /// Drop the lock for `key` if idle. Returns whether it is gone.
    pub fn evict(&self, key: &str) -> bool {
        let mut locks = self.locks.lock();
        match locks.get(key) {
            Some(lock) if Arc::strong_count(lock) > 1 => false,
            _ => {
                locks.remove(key);
                true
            }
        }
    }

    /// Evict every idle lock whose key is not in `live`.
    pub fn retain(&self, live: &HashSet<String>) {
        self.locks.lock().retain(|key, lock| live.contains(key) || Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: Default> Default for KeyedLocks<L> {
    fn default() -> Self {
        Self::new()
    }
}
