//! Transport seam between the scan and the network
//!
//! The dispatcher only ever needs "GET this URL and give me the JSON
//! document". Keeping that behind a trait lets the scan run against the real
//! HTTP client or an in-memory registry.

use crate::error::FetchError;
use async_trait::async_trait;

/// Registry transport operations
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Issue one GET and decode the response body as JSON
    async fn get_json(&self, url: &str, accept: Option<&str>) -> Result<serde_json::Value, FetchError>;

    /// Number of requests issued so far
    fn requests_issued(&self) -> u64;
}
