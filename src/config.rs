//! Configuration Module
//!
//! Handles loading and validating cache configuration.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// Fixed once the engine is built. All values can be configured via
/// environment variables with sensible defaults, or deserialized from the
/// owner's own configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_cached_data: usize,
    /// Number of top-ranked entries scanned for background refresh
    pub max_refresh_candidates: usize,
    /// Age in milliseconds after which an entry is eligible for refresh
    pub stale_after_ms: u64,
    /// Number of workers draining the refresh queue
    pub refresh_workers: usize,
    /// Pending refreshes accepted before new ones are rejected
    pub refresh_queue_capacity: usize,
    /// Score added to an entry on every cache hit
    pub access_bonus: u64,
    /// Score removed from every entry on each maintenance pass
    pub decay_step: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REFRESH_CACHE_MAX_CACHED_DATA` - Capacity (default: 1000)
    /// - `REFRESH_CACHE_MAX_REFRESH_CANDIDATES` - Refresh scan width (default: 10)
    /// - `REFRESH_CACHE_STALE_AFTER_MS` - Staleness threshold (default: 60000)
    /// - `REFRESH_CACHE_REFRESH_WORKERS` - Refresh workers (default: 4)
    /// - `REFRESH_CACHE_REFRESH_QUEUE_CAPACITY` - Refresh queue size (default: 64)
    /// - `REFRESH_CACHE_ACCESS_BONUS` - Score per hit (default: 4)
    /// - `REFRESH_CACHE_DECAY_STEP` - Score decay per pass (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_cached_data: env_or("REFRESH_CACHE_MAX_CACHED_DATA", defaults.max_cached_data),
            max_refresh_candidates: env_or(
                "REFRESH_CACHE_MAX_REFRESH_CANDIDATES",
                defaults.max_refresh_candidates,
            ),
            stale_after_ms: env_or("REFRESH_CACHE_STALE_AFTER_MS", defaults.stale_after_ms),
            refresh_workers: env_or("REFRESH_CACHE_REFRESH_WORKERS", defaults.refresh_workers),
            refresh_queue_capacity: env_or(
                "REFRESH_CACHE_REFRESH_QUEUE_CAPACITY",
                defaults.refresh_queue_capacity,
            ),
            access_bonus: env_or("REFRESH_CACHE_ACCESS_BONUS", defaults.access_bonus),
            decay_step: env_or("REFRESH_CACHE_DECAY_STEP", defaults.decay_step),
        }
    }

    /// Staleness threshold as a [`Duration`].
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    // == Validate ==
    /// Checks the invariants the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.max_cached_data == 0 {
            return Err(CacheError::InvalidConfig(
                "max_cached_data must be positive".to_string(),
            ));
        }
        if self.max_refresh_candidates == 0 || self.max_refresh_candidates > self.max_cached_data
        {
            return Err(CacheError::InvalidConfig(format!(
                "max_refresh_candidates must be between 1 and {}",
                self.max_cached_data
            )));
        }
        if self.refresh_workers == 0 {
            return Err(CacheError::InvalidConfig(
                "refresh_workers must be positive".to_string(),
            ));
        }
        if self.refresh_queue_capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "refresh_queue_capacity must be positive".to_string(),
            ));
        }
        if self.access_bonus == 0 {
            return Err(CacheError::InvalidConfig(
                "access_bonus must be positive".to_string(),
            ));
        }
        if self.decay_step == 0 {
            return Err(CacheError::InvalidConfig(
                "decay_step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cached_data: 1000,
            max_refresh_candidates: 10,
            stale_after_ms: 60_000,
            refresh_workers: 4,
            refresh_queue_capacity: 64,
            access_bonus: 4,
            decay_step: 1,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
