//! Registry catalog scanner
//!
//! Walks a Docker registry (catalog, then every repository's tags, then
//! every tag's manifest) and produces a snapshot of each tag with the
//! creation time of its newest layer.

pub mod cli;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod image;
pub mod logging;
pub mod output;
pub mod registry;
pub mod scan;

pub use error::{FetchError, RegmanError, Result};
pub use logging::Logger;
pub use scan::{Dispatcher, Report, ScanOutcome};
