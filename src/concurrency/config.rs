//! Concurrency configuration for the scan

use super::ConcurrencyError;
use std::time::Duration;

/// Limits applied to the fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    /// Maximum registry requests in flight at once, independent of how many
    /// repositories or tags are discovered
    pub max_in_flight: usize,
    /// Capacity of the message stream feeding the dispatcher
    pub channel_capacity: usize,
    /// Optional deadline for the whole scan
    pub deadline: Option<Duration>,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 16,
            channel_capacity: 256,
            deadline: None,
        }
    }
}

impl ConcurrencyConfig {
    pub const MAX_IN_FLIGHT_LIMIT: usize = 1024;

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validate(&self) -> Result<(), ConcurrencyError> {
        if self.max_in_flight == 0 {
            return Err(ConcurrencyError::InvalidConfiguration(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        if self.max_in_flight > Self::MAX_IN_FLIGHT_LIMIT {
            return Err(ConcurrencyError::InvalidConfiguration(format!(
                "concurrency cannot exceed {}",
                Self::MAX_IN_FLIGHT_LIMIT
            )));
        }
        if self.channel_capacity == 0 {
            return Err(ConcurrencyError::InvalidConfiguration(
                "channel capacity must be greater than 0".to_string(),
            ));
        }
        if self.deadline == Some(Duration::ZERO) {
            return Err(ConcurrencyError::InvalidConfiguration(
                "deadline must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
