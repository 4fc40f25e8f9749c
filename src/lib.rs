//! Refresh Cache - A self-refreshing, size-bounded value cache
//!
//! Serves possibly-stale values instantly, recomputes popular stale entries in
//! the background, and admits or evicts entries by a decaying usage score.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{
    CacheEngine, CacheEngineBuilder, CacheStats, Clock, ManualClock, SystemClock, ValueLoader,
};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
