//! Suspension worker configuration.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the poll interval in milliseconds.
pub const POLL_INTERVAL_ENV: &str = "HUMAN_TASK_POLL_INTERVAL_MS";
/// Environment variable holding the job lease in milliseconds.
pub const LEASE_ENV: &str = "HUMAN_TASK_LEASE_MS";
/// Environment variable holding the maximum jobs claimed per poll.
pub const BATCH_SIZE_ENV: &str = "HUMAN_TASK_BATCH_SIZE";

/// Errors raised while reading worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable was present but could not be used.
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

/// Polling and leasing parameters for the suspension worker.
///
/// # Examples
///
/// ```
/// use human_task::task::services::SuspensionWorkerConfig;
/// use std::time::Duration;
///
/// let config = SuspensionWorkerConfig::default();
/// assert_eq!(config.poll_interval, Duration::from_secs(1));
/// assert_eq!(config.batch_size, 50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspensionWorkerConfig {
    /// Delay between polls for due jobs.
    pub poll_interval: Duration,
    /// How long a claimed job stays invisible to other workers.
    pub lease: Duration,
    /// Maximum jobs claimed per poll.
    pub batch_size: usize,
}

impl Default for SuspensionWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            lease: Duration::from_secs(30),
            batch_size: 50,
        }
    }
}

impl SuspensionWorkerConfig {
    /// Creates a configuration with short intervals for tests.
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            lease: Duration::from_secs(1),
            batch_size: 50,
        }
    }

    /// Reads overrides from the environment, keeping defaults for unset
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is not a positive
    /// integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            poll_interval: read_positive(POLL_INTERVAL_ENV)?
                .map_or(defaults.poll_interval, Duration::from_millis),
            lease: read_positive(LEASE_ENV)?.map_or(defaults.lease, Duration::from_millis),
            batch_size: read_positive(BATCH_SIZE_ENV)?.map_or(defaults.batch_size, |size| {
                usize::try_from(size).unwrap_or(usize::MAX)
            }),
        })
    }
}

fn read_positive(key: &'static str) -> Result<Option<u64>, ConfigError> {
    let Ok(raw) = env::var(key) else {
        return Ok(None);
    };
    let invalid = |reason| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason,
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(invalid("must be greater than zero")),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(invalid("expected a positive integer")),
    }
}
