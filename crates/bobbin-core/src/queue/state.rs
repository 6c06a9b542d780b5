//! Task status machine for the queue.

use serde::{Deserialize, Serialize};

/// Task status.
///
/// Transitions:
/// - Pending -> Running -> Completed
/// - Pending -> Running -> Pending (retry backoff, loops until max_retries)
/// - Pending -> Running -> Failed | TimedOut (retries exhausted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued, or waiting for a retry timer.
    Pending,

    /// A handler attempt is in flight.
    Running,

    Completed,

    /// Last attempt returned an error (or panicked).
    Failed,

    /// Last attempt did not settle before its timeout.
    TimedOut,
}

impl TaskStatus {
    /// Is this a terminal status (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::TimedOut
        )
    }
}
