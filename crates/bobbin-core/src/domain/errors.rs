//! Errors - admission errors and normalized handler errors.
//!
//! - `QueueError`: returned synchronously from construction and `enqueue`.
//! - `TaskError`: what a handler attempt failed with; stored on the record,
//!   never propagated out of the scheduler.

use serde::{Deserialize, Serialize};

/// QueueError はキュー操作のエラー（同期的に呼び出し元へ返す）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("task handler is missing")]
    InvalidHandler,

    #[error("priority must be an integer in [1, 5], got {0}")]
    InvalidPriority(String),

    #[error("max_retries must not be negative, got {0}")]
    InvalidRetryBudget(i64),

    #[error("max_concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("queue has been disposed")]
    QueueDisposed,

    #[error("no tokio runtime available to drive the queue")]
    NoRuntime,

    #[error("invalid queue config: {0}")]
    InvalidConfig(String),
}

/// ErrorKind は handler 失敗の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The handler returned an error.
    Failed,
    /// The handler panicked; the payload was turned into the message.
    Panicked,
}

/// A handler failure, normalized so every attempt outcome has the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct TaskError {
    kind: ErrorKind,
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Failed,
            message: message.into(),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Panicked,
            message: message.into(),
        }
    }

    /// Wrap any error type, keeping only its rendered message.
    pub fn from_error<E: std::error::Error>(err: E) -> Self {
        Self::new(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
