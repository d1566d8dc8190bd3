//! Result set owned by the dispatcher and the assembler that orders it

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Output layout of the `Created` field
pub const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One tag of a repository with its newest layer creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDetail {
    #[serde(rename = "Tag")]
    pub tag: String,

    #[serde(rename = "Created", serialize_with = "serialize_created")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TagDetail {
    pub fn new(tag: impl Into<String>, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            tag: tag.into(),
            created_at,
        }
    }
}

fn serialize_created<S>(created_at: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match created_at {
        Some(ts) => serializer.collect_str(&ts.format(CREATED_FORMAT)),
        None => serializer.serialize_none(),
    }
}

/// Tag details collected so far, keyed by repository.
///
/// Only the dispatcher mutates it. A repository appears once its first tag
/// detail arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    repositories: BTreeMap<String, Vec<TagDetail>>,
}

impl ResultSet {
    pub fn insert(&mut self, repository: &str, detail: TagDetail) {
        self.repositories
            .entry(repository.to_string())
            .or_default()
            .push(detail);
    }
}

/// Final, ordered snapshot ready for serialization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Report {
    repositories: BTreeMap<String, Vec<TagDetail>>,
}

impl Report {
    pub fn repository_count(&self) -> usize {
        self.repositories.len()
    }

    pub fn tag_count(&self) -> usize {
        self.repositories.values().map(Vec::len).sum()
    }

    pub fn tags(&self, repository: &str) -> Option<&[TagDetail]> {
        self.repositories.get(repository).map(Vec::as_slice)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(String::as_str)
    }
}

/// Order every repository's tags newest first.
///
/// Equal timestamps fall back to tag name ascending; tags without a
/// creation time come last, also by name.
pub fn assemble(results: ResultSet) -> Report {
    let mut repositories = results.repositories;
    for details in repositories.values_mut() {
        details.sort_by(newest_first);
    }
    Report { repositories }
}

fn newest_first(a: &TagDetail, b: &TagDetail) -> Ordering {
    // `None` orders below every `Some`, so reversing puts it last
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.tag.cmp(&b.tag))
}
