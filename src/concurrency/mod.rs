//! Concurrency primitives for the registry scan
//!
//! - [`WorkTracker`] counts outstanding units of work in a fan-out whose
//!   size is only discovered while it runs, and signals completion once.
//! - [`ConcurrencyConfig`] bounds how many registry fetches are in flight
//!   and how long the whole scan may take.

pub mod config;
pub mod tracker;

pub use config::ConcurrencyConfig;
pub use tracker::{WorkTracker, WorkUnit};

/// Concurrency error types
#[derive(Debug, thiserror::Error)]
pub enum ConcurrencyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
