use serde::Deserialize;

/// Media types that carry `history[].v1Compatibility`
pub const SCHEMA1_MEDIA_TYPES: &[&str] = &[
    "application/vnd.docker.distribution.manifest.v1+prettyjws",
    "application/vnd.docker.distribution.manifest.v1+json",
];

/// Image manifest, version 2 schema 1.
///
/// Only the layer history is read. Entries are kept as raw JSON so that one
/// malformed entry cannot spoil the rest of the document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestSchema1 {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    pub history: Vec<serde_json::Value>,
}

/// The document embedded in a `v1Compatibility` string
#[derive(Debug, Clone, Deserialize)]
pub struct V1Compatibility {
    #[serde(default)]
    pub created: Option<String>,
}

impl ManifestSchema1 {
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn accept_header() -> String {
        SCHEMA1_MEDIA_TYPES.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_history_is_rejected() {
        let result = ManifestSchema1::from_value(json!({ "name": "a", "tag": "v1" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_history_entries_kept_raw() {
        let manifest = ManifestSchema1::from_value(json!({
            "name": "a",
            "tag": "v1",
            "history": [
                { "v1Compatibility": "{\"created\":\"2023-01-01T00:00:00Z\"}" },
                "not an object"
            ]
        }))
        .unwrap();
        assert_eq!(manifest.history.len(), 2);
        assert_eq!(manifest.tag.as_deref(), Some("v1"));
    }
}
