//! Registry module for Docker registry interactions
//!
//! This module provides the HTTP client, the transport seam it implements,
//! and the Docker Registry HTTP API v2 read operations the scan relies on.

pub mod api;
pub mod client;
pub mod transport;

pub use api::RegistryApi;
pub use client::{FetchConfig, RegistryClient, RegistryClientBuilder};
pub use transport::RegistryTransport;
