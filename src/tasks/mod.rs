//! Background Tasks Module
//!
//! Contains the machinery that runs cache refreshes off the read path.
//!
//! # Tasks
//! - In-flight registry: at most one refresh per key
//! - Refresh pool: bounded queue drained by Tokio workers

mod inflight;
mod refresh;

pub use inflight::{InFlightGuard, RefreshCoordinator};
pub use refresh::{RefreshJob, RefreshPool, SubmitError};
