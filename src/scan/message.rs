//! Messages flowing from scan tasks to the dispatcher

use crate::concurrency::WorkUnit;
use chrono::{DateTime, Utc};

/// Result of one finished scan task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMessage {
    /// Repository names from the root catalog fetch
    RepoList { repos: Vec<String> },

    /// Tag names of one repository
    TagList { repo: String, tags: Vec<String> },

    /// Creation time of one tag, `None` when its history had no usable entry
    TagDetail {
        repo: String,
        tag: String,
        created_at: Option<DateTime<Utc>>,
    },
}

impl ScanMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ScanMessage::RepoList { .. } => "RepoList",
            ScanMessage::TagList { .. } => "TagList",
            ScanMessage::TagDetail { .. } => "TagDetail",
        }
    }
}

/// A message together with the unit of work that produced it.
///
/// The unit stays outstanding until the dispatcher has handled the message,
/// so a message waiting in the channel keeps the scan alive.
#[derive(Debug)]
pub struct Delivery {
    pub message: ScanMessage,
    pub unit: WorkUnit,
}
