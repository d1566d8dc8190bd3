//! Registry API operations used by the scan
//!
//! Implements the three read-only Docker Registry v2 calls:
//! - Catalog listing (GET /v2/_catalog)
//! - Tag listing (GET /v2/{name}/tags/list)
//! - Manifest retrieval (GET /v2/{name}/manifests/{reference})

use crate::config::RegistryEndpoint;
use crate::error::FetchError;
use crate::image::manifest::ManifestSchema1;
use crate::registry::transport::RegistryTransport;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct RegistryApi {
    transport: Arc<dyn RegistryTransport>,
    base_url: String,
}

impl RegistryApi {
    pub fn new(transport: Arc<dyn RegistryTransport>, endpoint: &RegistryEndpoint) -> Self {
        Self {
            transport,
            base_url: endpoint.base_url(),
        }
    }

    pub fn requests_issued(&self) -> u64 {
        self.transport.requests_issued()
    }

    pub fn catalog_url(&self) -> String {
        format!("{}/v2/_catalog", self.base_url)
    }

    pub fn tags_url(&self, repository: &str) -> String {
        format!("{}/v2/{}/tags/list", self.base_url, repository)
    }

    pub fn manifest_url(&self, repository: &str, reference: &str) -> String {
        format!("{}/v2/{}/manifests/{}", self.base_url, repository, reference)
    }

    /// List all repository names in the registry
    pub async fn list_repositories(&self) -> Result<Vec<String>, FetchError> {
        let url = self.catalog_url();
        let doc = self.transport.get_json(&url, None).await?;
        string_list(&url, &doc, "repositories", false)
    }

    /// List all tags of a repository; a `null` tag list counts as empty
    pub async fn list_tags(&self, repository: &str) -> Result<Vec<String>, FetchError> {
        let url = self.tags_url(repository);
        let doc = self.transport.get_json(&url, None).await?;
        string_list(&url, &doc, "tags", true)
    }

    /// Fetch the schema 1 manifest of a tag
    pub async fn get_manifest(&self, repository: &str, tag: &str) -> Result<ManifestSchema1, FetchError> {
        let url = self.manifest_url(repository, tag);
        let accept = ManifestSchema1::accept_header();
        let doc = self.transport.get_json(&url, Some(&accept)).await?;

        let registry_errors = describe_registry_errors(&doc);
        ManifestSchema1::from_value(doc).map_err(|e| match registry_errors {
            Some(errors) => FetchError::shape(&url, errors),
            None => FetchError::shape(&url, e.to_string()),
        })
    }
}

fn string_list(url: &str, doc: &Value, field: &str, null_is_empty: bool) -> Result<Vec<String>, FetchError> {
    let missing = || match describe_registry_errors(doc) {
        Some(errors) => FetchError::shape(url, errors),
        None => FetchError::shape(url, format!("missing {:?} field", field)),
    };

    match doc.get(field) {
        None => Err(missing()),
        Some(Value::Null) if null_is_empty => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    FetchError::shape(url, format!("non-string entry in {:?}: {}", field, item))
                })
            })
            .collect(),
        Some(other) => Err(FetchError::shape(
            url,
            format!("{:?} is not an array: {}", field, other),
        )),
    }
}

/// Summarise a registry `{"errors": [...]}` document, if that is what we got
fn describe_registry_errors(doc: &Value) -> Option<String> {
    let errors = doc.get("errors")?.as_array()?;
    let codes: Vec<String> = errors
        .iter()
        .map(|err| {
            let code = err.get("code").and_then(Value::as_str).unwrap_or("UNKNOWN");
            match err.get("message").and_then(Value::as_str) {
                Some(message) => format!("{}: {}", code, message),
                None => code.to_string(),
            }
        })
        .collect();
    Some(format!("registry returned errors [{}]", codes.join(", ")))
}
