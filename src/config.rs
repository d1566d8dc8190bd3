//! Registry alias table and target resolution
//!
//! A target given on the command line is either an alias from the alias
//! table or a raw `host[:port]` address. Either way it resolves to a single
//! immutable [`RegistryEndpoint`] used for the whole run.

use crate::error::{RegmanError, Result};
use crate::logging::Logger;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// One entry of the alias table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryAlias {
    pub alias: String,
    pub host: String,
    pub port: u16,
    #[serde(alias = "scheme", default = "default_schema")]
    pub schema: String,
    /// Skip TLS verification for this registry
    #[serde(default)]
    pub insecure: bool,
}

fn default_schema() -> String {
    "http".to_string()
}

impl RegistryAlias {
    pub fn address(&self) -> String {
        format!("{}://{}:{}", self.schema, self.host, self.port)
    }
}

/// Alias table loaded from `~/.regman/config.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTable {
    #[serde(default)]
    pub registries: Vec<RegistryAlias>,
}

impl AliasTable {
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".regman").join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegmanError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            RegmanError::Config(format!("Cannot parse {}: {}", path.display(), e))
        })
    }

    /// Load the table, falling back to an empty one on any failure.
    ///
    /// A missing or broken alias file only disables alias lookup; raw
    /// addresses still resolve.
    pub fn load_or_empty(path: Option<&Path>, logger: &Logger) -> Self {
        let Some(path) = path else {
            logger.verbose("No home directory found, alias table is empty");
            return Self::default();
        };

        match Self::load(path) {
            Ok(table) => {
                logger.verbose(&format!(
                    "Loaded {} registry aliases from {}",
                    table.registries.len(),
                    path.display()
                ));
                table
            }
            Err(e) => {
                logger.warning(&format!("{}; continuing without aliases", e));
                Self::default()
            }
        }
    }

    /// Case-insensitive alias lookup; the first matching entry wins
    pub fn find(&self, alias: &str) -> Option<&RegistryAlias> {
        self.registries
            .iter()
            .find(|reg| reg.alias.eq_ignore_ascii_case(alias))
    }
}

/// Resolved base address of the registry being scanned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    scheme: String,
    host: String,
    port: u16,
}

impl RegistryEndpoint {
    pub fn parse(address: &str) -> Result<Self> {
        let invalid = |message: String| RegmanError::InvalidTarget {
            target: address.to_string(),
            message,
        };

        let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
        let scheme = url.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(invalid(format!("unsupported scheme {:?}", scheme)));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port".to_string()))?;

        Ok(Self { scheme, host, port })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl fmt::Display for RegistryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

/// A command-line target after alias lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub endpoint: RegistryEndpoint,
    pub alias: Option<String>,
    pub insecure: bool,
}

impl ResolvedTarget {
    pub fn resolve(target: &str, table: &AliasTable) -> Result<Self> {
        let target = target.trim();
        if target.is_empty() {
            return Err(RegmanError::MissingTarget);
        }

        if let Some(reg) = table.find(target) {
            return Ok(Self {
                endpoint: RegistryEndpoint::parse(&reg.address())?,
                alias: Some(reg.alias.clone()),
                insecure: reg.insecure,
            });
        }

        let address = if target.contains("://") {
            target.to_string()
        } else {
            format!("http://{}", target)
        };

        Ok(Self {
            endpoint: RegistryEndpoint::parse(&address)?,
            alias: None,
            insecure: false,
        })
    }
}
