//! Error types for the refresh cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The value loader failed while serving a cache miss
    #[error("Failed to compute value for key {key}")]
    Compute {
        /// Debug rendering of the key that failed
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No Tokio runtime to host the refresh pool
    #[error("No Tokio runtime available for background refreshes")]
    RuntimeUnavailable,
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
