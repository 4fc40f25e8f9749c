//! Cache Module
//!
//! Provides a size-bounded cache ranked by decaying usage scores, with
//! deduplicated background refresh of stale, popular entries.

mod builder;
mod clock;
mod engine;
mod entry;
mod loader;
mod ranked;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use builder::CacheEngineBuilder;
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use engine::CacheEngine;
pub use entry::{RankKey, ScoredEntry};
pub use loader::{CacheKey, ValueLoader};
pub use ranked::RankedIndex;
pub use stats::{CacheStats, StatsRecorder};
pub use store::KeyedStore;

// == Public Constants ==
/// Score of a freshly computed entry and floor of the decay pass
pub const BASELINE_SCORE: u64 = 0;
