//! Input specs for enqueue (handler + payload + scheduling options).
//!
//! Options are kept loose on purpose (`serde_json::Number`, `i64`) so values
//! coming from JSON or from callers are validated in one place, at enqueue.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::errors::QueueError;
use super::priority::Priority;
use crate::handler::TaskHandler;

/// Per-task scheduling options. Every field falls back to a queue default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Integer in `[1, 5]`; 1 is the most urgent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Number>,

    /// Retry budget; must not be negative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<i64>,

    /// Overrides the queue's default timeout for this task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// What a caller hands to `TaskQueue::enqueue`.
#[derive(Clone, Default)]
pub struct TaskSpec {
    handler: Option<Arc<dyn TaskHandler>>,
    data: Arc<Value>,
    options: TaskOptions,
    /// Set by `timeout()`; kept as a `Duration` so sub-millisecond values survive.
    timeout: Option<Duration>,
}

impl TaskSpec {
    pub fn new(handler: impl TaskHandler + 'static) -> Self {
        Self::from_handler(Arc::new(handler))
    }

    pub fn from_handler(handler: Arc<dyn TaskHandler>) -> Self {
        Self {
            handler: Some(handler),
            ..Self::default()
        }
    }

    /// Payload passed to every attempt. Passing an `Arc` keeps its identity.
    pub fn data(mut self, data: impl Into<Arc<Value>>) -> Self {
        self.data = data.into();
        self
    }

    pub fn priority(mut self, priority: impl Into<Number>) -> Self {
        self.options.priority = Some(priority.into());
        self
    }

    pub fn max_retries(mut self, max_retries: i64) -> Self {
        self.options.max_retries = Some(max_retries);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.options.timeout_ms = None;
        self
    }

    /// Replace all options at once (e.g. options deserialized from JSON).
    pub fn options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self.timeout = None;
        self
    }

    /// Check the spec and resolve defaults. Nothing is created on failure.
    pub(crate) fn validate(self, default_max_retries: u32) -> Result<ValidatedSpec, QueueError> {
        let handler = self.handler.ok_or(QueueError::InvalidHandler)?;

        let priority = match &self.options.priority {
            Some(n) => Priority::try_from(n)?,
            None => Priority::default(),
        };

        let max_retries = match self.options.max_retries {
            Some(n) if n < 0 => return Err(QueueError::InvalidRetryBudget(n)),
            Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
            None => default_max_retries,
        };

        Ok(ValidatedSpec {
            handler,
            data: self.data,
            priority,
            max_retries,
            timeout: self
                .timeout
                .or(self.options.timeout_ms.map(Duration::from_millis)),
        })
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("has_handler", &self.handler.is_some())
            .field("data", &self.data)
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A spec that passed validation, with defaults applied.
pub(crate) struct ValidatedSpec {
    pub handler: Arc<dyn TaskHandler>,
    pub data: Arc<Value>,
    pub priority: Priority,
    pub max_retries: u32,
    pub timeout: Option<Duration>,
}
