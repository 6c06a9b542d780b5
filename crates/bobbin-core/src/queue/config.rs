//! Queue configuration.
//!
//! Every field has a serde default, so `{}` is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetryPolicy;
use crate::domain::QueueError;

/// Where a task re-enters the pending order after a retry delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryArrival {
    /// Behind every task of the same priority that is already pending.
    #[default]
    Fresh,
    /// At the position it was first enqueued with.
    Original,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of attempts running at once. Must be at least 1.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Retry budget for tasks that do not set one.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,

    /// Backoff before the first retry; doubles on each further retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Cap for a single backoff delay.
    #[serde(default)]
    pub max_retry_delay_ms: Option<u64>,

    /// Attempt timeout for tasks that do not set one. `None` disables it.
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,

    #[serde(default)]
    pub retry_arrival: RetryArrival,
}

fn default_max_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            default_max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_retry_delay_ms: None,
            default_timeout_ms: None,
            retry_arrival: RetryArrival::default(),
        }
    }
}

impl QueueConfig {
    pub fn from_json_str(json: &str) -> Result<Self, QueueError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| QueueError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.max_concurrency == 0 {
            return Err(QueueError::InvalidConcurrency(self.max_concurrency));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(self.retry_base_delay_ms))
            .with_max_delay(self.max_retry_delay_ms.map(Duration::from_millis))
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}
