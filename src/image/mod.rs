//! Image manifest documents and layer history analysis

pub mod history;
pub mod manifest;

pub use history::{HistoryAnalysis, HistoryEntryError, latest_creation};
pub use manifest::ManifestSchema1;
