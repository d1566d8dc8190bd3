//! Categorisation of transport errors into the fetch error taxonomy

use crate::error::{FetchError, NetworkErrorKind};

/// Network error categorization and handling
pub struct NetworkErrorHandler;

impl NetworkErrorHandler {
    /// Map a reqwest failure onto a [`FetchError::Network`] with its category
    pub fn handle_network_error(error: &reqwest::Error, url: &str) -> FetchError {
        let text = error.to_string();
        let kind = Self::categorize(error.is_timeout(), error.is_connect(), &text);

        FetchError::Network {
            url: url.to_string(),
            kind,
            message: text,
        }
    }

    fn categorize(is_timeout: bool, is_connect: bool, text: &str) -> NetworkErrorKind {
        let lower = text.to_lowercase();
        if is_timeout {
            NetworkErrorKind::Timeout
        } else if lower.contains("dns") || lower.contains("resolve") {
            NetworkErrorKind::Dns
        } else if lower.contains("certificate") || lower.contains("tls") {
            NetworkErrorKind::Tls
        } else if is_connect {
            NetworkErrorKind::Connect
        } else {
            NetworkErrorKind::Other
        }
    }
}
