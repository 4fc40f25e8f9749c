//! In-Flight Refresh Registry
//!
//! Tracks which keys have a background recomputation underway and guarantees
//! at most one per key.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashSet;

// == Refresh Coordinator ==
/// Set of keys currently being refreshed.
pub struct RefreshCoordinator<K: Eq + Hash> {
    in_flight: DashSet<K>,
}

impl<K: Eq + Hash + Clone> Default for RefreshCoordinator<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> RefreshCoordinator<K> {
    pub fn new() -> Self {
        Self {
            in_flight: DashSet::new(),
        }
    }

    // == Try Begin ==
    /// Marks `key` in flight. Returns false if it already was.
    pub fn try_begin(&self, key: K) -> bool {
        self.in_flight.insert(key)
    }

    // == End ==
    /// Clears the in-flight mark for `key`.
    pub fn end(&self, key: &K) {
        self.in_flight.remove(key);
    }

    // == Begin (guarded) ==
    /// Like [`try_begin`](Self::try_begin), but hands back a guard that ends
    /// the refresh when dropped.
    pub fn begin(self: &Arc<Self>, key: K) -> Option<InFlightGuard<K>> {
        if self.try_begin(key.clone()) {
            Some(InFlightGuard {
                coordinator: Arc::clone(self),
                key,
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.contains(key)
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

impl<K: Eq + Hash> fmt::Debug for RefreshCoordinator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

// == In-Flight Guard ==
/// Holds a key's in-flight mark; dropping it ends the refresh exactly once.
pub struct InFlightGuard<K: Eq + Hash + Clone> {
    coordinator: Arc<RefreshCoordinator<K>>,
    key: K,
}

impl<K: Eq + Hash + Clone> InFlightGuard<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash + Clone> Drop for InFlightGuard<K> {
    fn drop(&mut self) {
        self.coordinator.end(&self.key);
    }
}

impl<K: Eq + Hash + Clone + fmt::Debug> fmt::Debug for InFlightGuard<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightGuard").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_try_begin_is_exclusive() {
        let coordinator = RefreshCoordinator::new();

        assert!(coordinator.try_begin("a"));
        assert!(!coordinator.try_begin("a"));
        assert!(coordinator.try_begin("b"), "other keys are independent");
        assert_eq!(coordinator.len(), 2);

        coordinator.end(&"a");
        assert!(!coordinator.is_in_flight(&"a"));
        assert!(coordinator.try_begin("a"));
    }

    #[test]
    fn test_end_unknown_key_is_noop() {
        let coordinator: RefreshCoordinator<&str> = RefreshCoordinator::new();
        coordinator.end(&"missing");
        assert!(coordinator.is_empty());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let coordinator = Arc::new(RefreshCoordinator::new());

        let guard = coordinator.begin("a").unwrap();
        assert_eq!(guard.key(), &"a");
        assert!(coordinator.is_in_flight(&"a"));
        assert!(coordinator.begin("a").is_none());

        drop(guard);
        assert!(!coordinator.is_in_flight(&"a"));
        assert!(coordinator.begin("a").is_some());
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let guard = coordinator.begin("a").unwrap();

        let result = thread::spawn(move || {
            let _guard = guard;
            panic!("computation blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!coordinator.is_in_flight(&"a"));
    }

    #[test]
    fn test_concurrent_begin_single_winner() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let barrier = Arc::new(Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    coordinator.try_begin("hot".to_string())
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
