//! Registry scan: fan-out over repositories and tags, fan-in into one report
//!
//! The [`Dispatcher`] drives the scan, [`ScanMessage`] is what its tasks send
//! back, and [`assemble`] turns the collected [`ResultSet`] into the ordered
//! [`Report`].

pub mod dispatcher;
pub mod message;
pub mod report;

pub use dispatcher::{Completion, Dispatcher, ScanOutcome, ScanStats};
pub use message::ScanMessage;
pub use report::{Report, ResultSet, TagDetail, assemble};
