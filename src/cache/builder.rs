//! Builder Module
//!
//! Fluent configuration for [`CacheEngine`], including the clock and the
//! runtime hosting the refresh pool.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::engine::CacheEngine;
use crate::cache::loader::{CacheKey, ValueLoader};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::RefreshPool;

// == Cache Engine Builder ==
/// Builder for configuring a [`CacheEngine`].
///
/// # Example
///
/// ```ignore
/// let cache = CacheEngine::builder(|key: &String| -> anyhow::Result<usize> { Ok(key.len()) })
///     .max_cached_data(500)
///     .max_refresh_candidates(20)
///     .stale_after(Duration::from_secs(30))
///     .build()?;
/// ```
pub struct CacheEngineBuilder<K, V, L> {
    loader: L,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    runtime: Option<Handle>,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K, V, L> CacheEngineBuilder<K, V, L>
where
    K: CacheKey,
    V: Send + Sync + 'static,
    L: ValueLoader<K, V>,
{
    /// Create a new builder around the loader that computes values.
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            config: CacheConfig::default(),
            clock: Arc::new(SystemClock),
            runtime: None,
            _types: PhantomData,
        }
    }

    // == Settings ==
    /// Replace every setting at once.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Maximum number of cached entries.
    ///
    /// Default: 1000
    pub fn max_cached_data(mut self, capacity: usize) -> Self {
        self.config.max_cached_data = capacity;
        self
    }

    /// Number of top-ranked entries scanned for refresh on every read.
    ///
    /// Default: 10
    pub fn max_refresh_candidates(mut self, candidates: usize) -> Self {
        self.config.max_refresh_candidates = candidates;
        self
    }

    /// Age after which an entry is refreshed in the background.
    ///
    /// Default: 60 seconds
    pub fn stale_after(mut self, stale_after: Duration) -> Self {
        self.config.stale_after_ms = u64::try_from(stale_after.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Workers draining the refresh queue.
    ///
    /// Default: 4
    pub fn refresh_workers(mut self, workers: usize) -> Self {
        self.config.refresh_workers = workers;
        self
    }

    /// Refreshes that may wait for a worker before new ones are rejected.
    ///
    /// Default: 64
    pub fn refresh_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.refresh_queue_capacity = capacity;
        self
    }

    /// Time source for creation stamps and staleness.
    ///
    /// Default: [`SystemClock`]
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Runtime hosting the refresh workers.
    ///
    /// Default: the runtime the builder is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    // == Build ==
    /// Validate the settings, start the refresh pool and build the cache.
    pub fn build(self) -> Result<CacheEngine<K, V, L>> {
        self.config.validate()?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| CacheError::RuntimeUnavailable)?,
        };
        let pool = RefreshPool::start(
            &runtime,
            self.config.refresh_workers,
            self.config.refresh_queue_capacity,
        );

        Ok(CacheEngine::from_parts(
            self.config,
            self.loader,
            self.clock,
            pool,
        ))
    }
}
