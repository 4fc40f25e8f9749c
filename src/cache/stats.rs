//! Cache Statistics Module
//!
//! Tracks cache activity: hits, misses, admissions, evictions and refreshes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that had to compute the value
    pub misses: u64,
    /// Computed values installed in the cache
    pub admissions: u64,
    /// Computed values returned but not cached
    pub rejections: u64,
    /// Entries removed to respect capacity
    pub evictions: u64,
    /// Refreshes handed to the refresh pool
    pub refreshes_scheduled: u64,
    /// Refreshes that installed a new value
    pub refreshes_completed: u64,
    /// Refreshes whose computation failed
    pub refreshes_failed: u64,
    /// Refreshes discarded because the entry left the cache meanwhile
    pub refreshes_abandoned: u64,
    /// Refreshes turned away by a full or closed queue
    pub refreshes_rejected: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Recorder ==
/// Lock-free counters shared by readers and refresh workers.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    admissions: AtomicU64,
    rejections: AtomicU64,
    evictions: AtomicU64,
    refreshes_scheduled: AtomicU64,
    refreshes_completed: AtomicU64,
    refreshes_failed: AtomicU64,
    refreshes_abandoned: AtomicU64,
    refreshes_rejected: AtomicU64,
}

macro_rules! recorder {
    ($($method:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $method(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    recorder! {
        record_hit => hits,
        record_miss => misses,
        record_admission => admissions,
        record_rejection => rejections,
        record_eviction => evictions,
        record_refresh_scheduled => refreshes_scheduled,
        record_refresh_completed => refreshes_completed,
        record_refresh_failed => refreshes_failed,
        record_refresh_abandoned => refreshes_abandoned,
        record_refresh_rejected => refreshes_rejected,
    }

    // == Snapshot ==
    /// Reads every counter; `total_entries` is supplied by the caller.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            admissions: self.admissions.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            refreshes_scheduled: self.refreshes_scheduled.load(Ordering::Relaxed),
            refreshes_completed: self.refreshes_completed.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
            refreshes_abandoned: self.refreshes_abandoned.load(Ordering::Relaxed),
            refreshes_rejected: self.refreshes_rejected.load(Ordering::Relaxed),
            total_entries,
        }
    }
}
