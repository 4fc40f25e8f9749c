//! Cache Engine Module
//!
//! Serves reads from the keyed store, admits computed values by rank, decays
//! usage scores and keeps hot entries fresh through background refreshes.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::builder::CacheEngineBuilder;
use crate::cache::clock::Clock;
use crate::cache::entry::ScoredEntry;
use crate::cache::loader::{CacheKey, ValueLoader};
use crate::cache::ranked::RankedIndex;
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::cache::store::KeyedStore;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{RefreshCoordinator, RefreshJob, RefreshPool, SubmitError};

// == Cache Engine ==
/// Size-bounded cache that serves stale values instantly and refreshes
/// popular entries in the background.
///
/// # Admission
///
/// A miss is cached while there is room. Once the cache is full, a new entry
/// is admitted only if it outranks the lowest-ranked cached entry. New
/// entries start at the baseline score and lose ties to older entries, so
/// with a forward-moving clock a full cache keeps its current keys and
/// rejects new ones (counted in [`CacheStats::rejections`]). Call
/// [`CacheEngine::remove`] to make room for a different working set.
///
/// Cloning is cheap; clones share the same cache.
pub struct CacheEngine<K: CacheKey, V, L> {
    inner: Arc<Inner<K, V, L>>,
}

struct Inner<K: CacheKey, V, L> {
    config: CacheConfig,
    loader: L,
    store: KeyedStore<K, V>,
    /// Instance lock. Every mutation of `store` happens while holding it.
    index: Mutex<RankedIndex<K, V>>,
    coordinator: Arc<RefreshCoordinator<K>>,
    pool: RefreshPool,
    clock: Arc<dyn Clock>,
    stats: StatsRecorder,
    next_seq: AtomicU64,
}

impl<K: CacheKey, V, L> Clone for CacheEngine<K, V, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, L> CacheEngine<K, V, L>
where
    K: CacheKey,
    V: Send + Sync + 'static,
    L: ValueLoader<K, V>,
{
    // == Constructors ==
    /// Starts configuring a cache around `loader`.
    pub fn builder(loader: L) -> CacheEngineBuilder<K, V, L> {
        CacheEngineBuilder::new(loader)
    }

    /// Builds a cache from `config` on the current Tokio runtime.
    pub fn new(config: CacheConfig, loader: L) -> Result<Self> {
        Self::builder(loader).config(config).build()
    }

    pub(crate) fn from_parts(
        config: CacheConfig,
        loader: L,
        clock: Arc<dyn Clock>,
        pool: RefreshPool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                loader,
                store: KeyedStore::new(),
                index: Mutex::new(RankedIndex::new()),
                coordinator: Arc::new(RefreshCoordinator::new()),
                pool,
                clock,
                stats: StatsRecorder::new(),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    // == Get Value ==
    /// Returns the value for `key`.
    ///
    /// A hit returns immediately, even if the entry is stale; a stale hit
    /// schedules a background refresh. A miss computes the value on the
    /// calling thread and caches it if admission allows. Every successful
    /// call then runs one maintenance pass.
    ///
    /// # Errors
    /// Returns [`CacheError::Compute`] when the loader fails on a miss.
    pub fn get_value(&self, key: &K) -> Result<Arc<V>> {
        let value = match self.inner.store.get(key) {
            Some(entry) => self.inner.serve_hit(&entry),
            None => self.inner.serve_miss(key)?,
        };

        self.inner.run_maintenance();
        Ok(value)
    }

    // == Contains ==
    pub fn contains(&self, key: &K) -> bool {
        self.inner.store.contains(key)
    }

    // == Remove ==
    /// Removes `key` from the cache. Returns false if it was not cached.
    pub fn remove(&self, key: &K) -> bool {
        let mut index = self.inner.index.lock();
        match self.inner.store.remove(key) {
            Some(entry) => {
                index.remove(&entry);
                true
            }
            None => false,
        }
    }

    // == Introspection ==
    /// Snapshot of the cached keys.
    pub fn cached_keys(&self) -> HashSet<K> {
        self.inner.store.keys()
    }

    /// Creation time of the cached value in Unix milliseconds, or 0 if absent.
    pub fn last_update_time(&self, key: &K) -> u64 {
        self.inner
            .store
            .get(key)
            .map(|entry| entry.created_at)
            .unwrap_or(0)
    }

    /// Creation time of the cached value as a UTC timestamp.
    pub fn last_update_time_utc(&self, key: &K) -> Option<DateTime<Utc>> {
        let entry = self.inner.store.get(key)?;
        i64::try_from(entry.created_at)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    /// Current usage score of `key`.
    pub fn score(&self, key: &K) -> Option<u64> {
        self.inner.store.get(key).map(|entry| entry.score)
    }

    /// Cached keys from highest to lowest rank.
    pub fn ranked_keys(&self) -> Vec<K> {
        self.inner.index.lock().keys_in_rank_order()
    }

    /// True while a background refresh for `key` is queued or running.
    pub fn is_refreshing(&self, key: &K) -> bool {
        self.inner.coordinator.is_in_flight(key)
    }

    /// Checks that the keyed store and the ranked index hold the same keys.
    pub fn is_consistent(&self) -> bool {
        let index = self.inner.index.lock();
        let ranked: HashSet<K> = index.keys_in_rank_order().into_iter().collect();
        index.len() == self.inner.store.len() && ranked == self.inner.store.keys()
    }

    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.inner.store.len())
    }

    // == Shutdown ==
    /// Stops the refresh workers. Reads keep working and keep serving
    /// stale values; new refreshes are rejected.
    pub fn shutdown(&self) {
        self.inner.pool.shutdown();
    }
}

impl<K, V, L> Inner<K, V, L>
where
    K: CacheKey,
    V: Send + Sync + 'static,
    L: ValueLoader<K, V>,
{
    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    // == Hit Path ==
    fn serve_hit(self: &Arc<Self>, entry: &ScoredEntry<K, V>) -> Arc<V> {
        self.stats.record_hit();
        self.record_access(&entry.key);

        if entry.is_stale(self.clock.now_ms(), self.config.stale_after_ms) {
            self.schedule_refresh(&entry.key);
        }

        Arc::clone(&entry.value)
    }

    fn record_access(&self, key: &K) {
        let mut index = self.index.lock();
        // Re-read under the lock: the entry may have been replaced or evicted.
        if let Some(current) = self.store.get(key) {
            let bumped = Arc::new(current.accessed(self.config.access_bonus));
            index.remove(&current);
            index.insert(Arc::clone(&bumped));
            self.store.put(bumped);
        }
    }

    // == Miss Path ==
    fn serve_miss(&self, key: &K) -> Result<Arc<V>> {
        self.stats.record_miss();

        let value = self
            .loader
            .load(key)
            .map(Arc::new)
            .map_err(|source| CacheError::Compute {
                key: format!("{key:?}"),
                source,
            })?;

        self.admit(key, Arc::clone(&value));
        Ok(value)
    }

    // == Admission ==
    fn admit(&self, key: &K, value: Arc<V>) {
        let mut index = self.index.lock();
        if self.store.contains(key) {
            debug!(?key, "Key cached by a concurrent miss, keeping existing entry");
            return;
        }

        let candidate = Arc::new(ScoredEntry::new(
            key.clone(),
            value,
            self.clock.now_ms(),
            self.next_seq(),
        ));
        let capacity = self.config.max_cached_data;
        let admitted = index.len() < capacity
            || index
                .lowest_ranked()
                .is_some_and(|lowest| candidate.outranks(lowest));

        if !admitted {
            self.stats.record_rejection();
            debug!(?key, "Cache full and value ranks too low, not admitted");
            return;
        }

        // Make room first so the store never exceeds capacity, even transiently.
        while index.len() >= capacity {
            let Some(victim) = index.pop_lowest() else {
                break;
            };
            self.store.remove(&victim.key);
            self.stats.record_eviction();
            debug!(key = ?victim.key, score = victim.score, "Evicted lowest-ranked entry");
        }

        index.insert(Arc::clone(&candidate));
        self.store.put(candidate);
        self.stats.record_admission();
    }

    // == Maintenance ==
    fn run_maintenance(self: &Arc<Self>) {
        let now = self.clock.now_ms();
        let step = self.config.decay_step;

        let stale: Vec<K> = {
            let mut index = self.index.lock();
            for decayed in index.rescore(|entry| entry.decayed_score(step)) {
                self.store.put(decayed);
            }
            index
                .top_k(self.config.max_refresh_candidates)
                .into_iter()
                .filter(|entry| entry.is_stale(now, self.config.stale_after_ms))
                .map(|entry| entry.key.clone())
                .collect()
        };

        for key in &stale {
            self.schedule_refresh(key);
        }
    }

    // == Refresh ==
    fn schedule_refresh(self: &Arc<Self>, key: &K) {
        let Some(guard) = self.coordinator.begin(key.clone()) else {
            return;
        };

        let engine = Arc::downgrade(self);
        let job: RefreshJob = Box::new(move || {
            if let Some(engine) = engine.upgrade() {
                engine.refresh_if_stale(guard.key());
            }
            drop(guard);
        });

        // A rejected job is dropped along with its guard, clearing the mark.
        match self.pool.try_submit(job) {
            Ok(()) => {
                self.stats.record_refresh_scheduled();
                debug!(?key, "Refresh scheduled");
            }
            Err(SubmitError::Full) => {
                self.stats.record_refresh_rejected();
                debug!(?key, "Refresh queue full, serving stale value");
            }
            Err(SubmitError::Closed) => {
                self.stats.record_refresh_rejected();
                warn!(?key, "Refresh pool closed, serving stale value");
            }
        }
    }

    /// Staleness was judged on a snapshot; another refresh may have landed since.
    fn refresh_if_stale(&self, key: &K) {
        match self.store.get(key) {
            None => {
                self.stats.record_refresh_abandoned();
                debug!(?key, "Entry left the cache before its refresh started");
            }
            Some(entry) if !entry.is_stale(self.clock.now_ms(), self.config.stale_after_ms) => {
                debug!(?key, "Entry already fresh, skipping refresh");
            }
            Some(_) => self.refresh(key),
        }
    }

    fn refresh(&self, key: &K) {
        let value = match self.loader.load(key) {
            Ok(value) => Arc::new(value),
            Err(err) => {
                self.stats.record_refresh_failed();
                warn!(?key, error = %err, "Background refresh failed, keeping stale value");
                return;
            }
        };

        let mut index = self.index.lock();
        let Some(current) = self.store.get(key) else {
            self.stats.record_refresh_abandoned();
            debug!(?key, "Entry left the cache during refresh, discarding value");
            return;
        };

        let created_at = self.clock.now_ms().max(current.created_at);
        let fresh = Arc::new(ScoredEntry::with_state(
            key.clone(),
            value,
            created_at,
            self.next_seq(),
            current.score,
        ));
        index.remove(&current);
        index.insert(Arc::clone(&fresh));
        self.store.put(fresh);
        drop(index);

        self.stats.record_refresh_completed();
        debug!(?key, created_at, "Refreshed entry");
    }
}

impl<K: CacheKey, V, L> fmt::Debug for CacheEngine<K, V, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEngine")
            .field("config", &self.inner.config)
            .field("len", &self.inner.store.len())
            .field("in_flight", &self.inner.coordinator.len())
            .finish()
    }
}
