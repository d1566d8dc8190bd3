//! Command line interface module
//!
//! Argument parsing with environment fallbacks, and the runner that turns
//! arguments into a finished scan.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::{Runner, ScanContext};
