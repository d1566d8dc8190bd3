//! Layer history analysis
//!
//! Computes when a tag was last built: the newest creation time across all
//! layer history entries of its manifest. Entries are unordered, so the
//! newest entry is found by comparison, never by position.

use super::manifest::{ManifestSchema1, V1Compatibility};
use chrono::{DateTime, Utc};

/// Why a single history entry was skipped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryEntryError {
    #[error("history[{index}]: {message}")]
    Shape { index: usize, message: String },

    #[error("history[{index}]: embedded document is not JSON: {message}")]
    Decode { index: usize, message: String },

    #[error("history[{index}]: invalid created timestamp {value:?}: {message}")]
    TimestampParse {
        index: usize,
        value: String,
        message: String,
    },
}

/// Result of analysing one manifest's history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryAnalysis {
    /// Newest creation time, or `None` when no entry could be parsed
    pub created_at: Option<DateTime<Utc>>,
    pub parsed: usize,
    pub skipped: Vec<HistoryEntryError>,
}

impl HistoryAnalysis {
    pub fn is_available(&self) -> bool {
        self.created_at.is_some()
    }
}

/// Newest creation time across every parsable history entry
pub fn latest_creation(manifest: &ManifestSchema1) -> HistoryAnalysis {
    let mut analysis = HistoryAnalysis::default();

    for (index, entry) in manifest.history.iter().enumerate() {
        match entry_created_at(index, entry) {
            Ok(created) => {
                analysis.parsed += 1;
                analysis.created_at = Some(match analysis.created_at {
                    Some(latest) => latest.max(created),
                    None => created,
                });
            }
            Err(e) => analysis.skipped.push(e),
        }
    }

    analysis
}

/// Parse an RFC 3339 timestamp with optional fractional seconds into UTC
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

fn entry_created_at(
    index: usize,
    entry: &serde_json::Value,
) -> Result<DateTime<Utc>, HistoryEntryError> {
    let embedded = entry
        .get("v1Compatibility")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HistoryEntryError::Shape {
            index,
            message: "missing v1Compatibility string".to_string(),
        })?;

    let compat: V1Compatibility =
        serde_json::from_str(embedded).map_err(|e| HistoryEntryError::Decode {
            index,
            message: e.to_string(),
        })?;

    let created = compat.created.ok_or_else(|| HistoryEntryError::Shape {
        index,
        message: "missing created field".to_string(),
    })?;

    parse_timestamp(&created).map_err(|e| HistoryEntryError::TimestampParse {
        index,
        value: created.clone(),
        message: e.to_string(),
    })
}
