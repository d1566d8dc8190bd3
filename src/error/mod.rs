//! Error types for registry fetches and for the run as a whole

pub mod handlers;

use reqwest::StatusCode;
use std::fmt;

pub type Result<T> = std::result::Result<T, RegmanError>;

/// Category of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Connect,
    Timeout,
    Dns,
    Tls,
    Other,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkErrorKind::Connect => "connect",
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Dns => "dns",
            NetworkErrorKind::Tls => "tls",
            NetworkErrorKind::Other => "network",
        };
        f.write_str(name)
    }
}

/// Failure of a single leaf fetch or parse.
///
/// These never abort a run; the task that hit one logs it and drops out
/// of the aggregation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("{kind} error fetching {url}: {message}")]
    Network {
        url: String,
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("Malformed JSON from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Unexpected document shape from {url}: {message}")]
    Shape { url: String, message: String },

    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn shape(url: &str, message: impl Into<String>) -> Self {
        FetchError::Shape {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub fn decode(url: &str, err: &serde_json::Error) -> Self {
        FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Run-level errors surfaced by the entry point
#[derive(Debug, thiserror::Error)]
pub enum RegmanError {
    #[error("Registry alias or address not given")]
    MissingTarget,

    #[error("Invalid registry address {target:?}: {message}")]
    InvalidTarget { target: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl RegmanError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            RegmanError::MissingTarget
            | RegmanError::InvalidTarget { .. }
            | RegmanError::Validation(_) => 2,
            RegmanError::Config(_) | RegmanError::Client(_) | RegmanError::Output(_) => 1,
        }
    }
}

impl From<serde_json::Error> for RegmanError {
    fn from(err: serde_json::Error) -> Self {
        RegmanError::Output(err.to_string())
    }
}

impl From<std::io::Error> for RegmanError {
    fn from(err: std::io::Error) -> Self {
        RegmanError::Output(err.to_string())
    }
}

impl From<crate::concurrency::ConcurrencyError> for RegmanError {
    fn from(err: crate::concurrency::ConcurrencyError) -> Self {
        RegmanError::Validation(err.to_string())
    }
}
