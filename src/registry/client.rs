// This file contains the reqwest-backed registry client. It owns the
// shared HTTP connection pool, bounds how many requests are in flight and
// counts every request it issues.

use crate::error::handlers::NetworkErrorHandler;
use crate::error::{FetchError, RegmanError, Result};
use crate::logging::Logger;
use crate::registry::transport::RegistryTransport;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// HTTP settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub skip_tls: bool,
    pub max_in_flight: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(5),
            skip_tls: false,
            max_in_flight: 16,
        }
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(RegmanError::Validation(
                "Timeouts must be greater than 0".to_string(),
            ));
        }
        if self.timeout > Duration::from_secs(3600) {
            return Err(RegmanError::Validation(
                "Request timeout cannot exceed 1 hour (3600 seconds)".to_string(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(RegmanError::Validation(
                "Concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct RegistryClientBuilder {
    config: FetchConfig,
    logger: Logger,
}

impl RegistryClientBuilder {
    pub fn new() -> Self {
        Self {
            config: FetchConfig::default(),
            logger: Logger::default(),
        }
    }

    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.config.skip_tls = skip_tls;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.config.max_in_flight = max_in_flight;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        self.config.validate()?;

        if self.config.skip_tls {
            self.logger
                .notice("TLS certificate verification is disabled for this run");
        }

        let client = Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.timeout)
            .pool_idle_timeout(self.config.idle_timeout)
            .tcp_keepalive(self.config.idle_timeout)
            .danger_accept_invalid_certs(self.config.skip_tls)
            .user_agent(concat!("regman/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegmanError::Client(e.to_string()))?;

        Ok(RegistryClient {
            client,
            limiter: Arc::new(Semaphore::new(self.config.max_in_flight)),
            requests: AtomicU64::new(0),
            logger: self.logger,
        })
    }
}

impl Default for RegistryClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetcher backed by a shared reqwest connection pool
pub struct RegistryClient {
    client: Client,
    limiter: Arc<Semaphore>,
    requests: AtomicU64,
    logger: Logger,
}

impl RegistryClient {
    pub fn builder() -> RegistryClientBuilder {
        RegistryClientBuilder::new()
    }
}

#[async_trait]
impl RegistryTransport for RegistryClient {
    async fn get_json(&self, url: &str, accept: Option<&str>) -> std::result::Result<serde_json::Value, FetchError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| FetchError::Cancelled)?;

        self.requests.fetch_add(1, Ordering::Relaxed);
        self.logger.debug(&format!("GET {}", url));

        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, url))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, url))?;

        decode_body(url, status, &body)
    }

    fn requests_issued(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

/// Decode a response body as JSON whatever the status, as long as there is
/// a usable body. A non-2xx status without one is an HTTP status error.
pub(crate) fn decode_body(
    url: &str,
    status: StatusCode,
    body: &[u8],
) -> std::result::Result<serde_json::Value, FetchError> {
    let status_error = || FetchError::HttpStatus {
        url: url.to_string(),
        status,
    };

    if body.iter().all(u8::is_ascii_whitespace) {
        if status.is_success() {
            return Err(FetchError::Decode {
                url: url.to_string(),
                message: "empty response body".to_string(),
            });
        }
        return Err(status_error());
    }

    match serde_json::from_slice(body) {
        Ok(value) => Ok(value),
        Err(e) if status.is_success() => Err(FetchError::decode(url, &e)),
        Err(_) => Err(status_error()),
    }
}
