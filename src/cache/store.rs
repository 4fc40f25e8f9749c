//! Keyed Store Module
//!
//! Concurrent key to entry lookup table, the system of record for what is cached.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::entry::ScoredEntry;

// == Keyed Store ==
/// Lock-free lookups over the cached entries.
///
/// Mutators must only be called while the engine holds its instance lock so
/// the store and the ranked index stay in step.
#[derive(Debug)]
pub struct KeyedStore<K: Eq + Hash, V> {
    entries: DashMap<K, Arc<ScoredEntry<K, V>>>,
}

impl<K: Eq + Hash + Clone, V> Default for KeyedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone, V> KeyedStore<K, V> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    // == Get ==
    /// Returns the entry for `key`. The shard guard is released before returning.
    pub fn get(&self, key: &K) -> Option<Arc<ScoredEntry<K, V>>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    // == Put ==
    /// Stores an entry under its own key, returning the one it replaced.
    pub fn put(&self, entry: Arc<ScoredEntry<K, V>>) -> Option<Arc<ScoredEntry<K, V>>> {
        self.entries.insert(entry.key.clone(), entry)
    }

    // == Remove ==
    pub fn remove(&self, key: &K) -> Option<Arc<ScoredEntry<K, V>>> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    // == Contains ==
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    // == Keys ==
    /// Snapshot of the cached keys.
    pub fn keys(&self) -> HashSet<K> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
