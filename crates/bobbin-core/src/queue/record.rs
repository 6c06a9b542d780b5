//! Task record: the queue's per-task bookkeeping and its public snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::TaskStatus;
use crate::domain::{Priority, TaskError, TaskId};

/// Snapshot of one task.
///
/// The queue owns the live copy; `get_task` and listeners receive clones.
/// All transitions go through the `pub(crate)` methods below.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,

    /// Payload handed to every attempt. Never mutated by the queue.
    pub data: Arc<Value>,

    pub priority: Priority,
    pub max_retries: u32,

    /// Handler invocations so far (including the current one while Running).
    pub attempts: u32,

    pub status: TaskStatus,

    pub created_at: DateTime<Utc>,
    /// First time the task started running.
    pub started_at: Option<DateTime<Utc>>,
    /// When a terminal status was reached.
    pub completed_at: Option<DateTime<Utc>>,

    /// Set only when Completed.
    pub result: Option<Value>,
    /// Last handler error. `None` after a terminal timeout.
    pub error: Option<TaskError>,
}

impl TaskRecord {
    pub(crate) fn new(
        id: TaskId,
        data: Arc<Value>,
        priority: Priority,
        max_retries: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            data,
            priority,
            max_retries,
            attempts: 0,
            status: TaskStatus::Pending,
            created_at,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Mark as running (increment attempts). Returns the attempt number.
    pub(crate) fn start_attempt(&mut self, now: DateTime<Utc>) -> u32 {
        self.status = TaskStatus::Running;
        self.attempts += 1;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.attempts
    }

    /// Does another attempt remain after the current one?
    pub(crate) fn has_retry_left(&self) -> bool {
        self.attempts < self.max_retries
    }

    pub(crate) fn mark_completed(&mut self, result: Value, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(now);
    }

    pub(crate) fn mark_failed(&mut self, error: TaskError, now: DateTime<Utc>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(now);
    }

    pub(crate) fn mark_timed_out(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::TimedOut;
        self.error = None;
        self.completed_at = Some(now);
    }

    /// Back to Pending while a backoff timer runs. A timed-out attempt
    /// passes `None` and keeps the previous error.
    pub(crate) fn schedule_retry(&mut self, error: Option<TaskError>) {
        self.status = TaskStatus::Pending;
        if error.is_some() {
            self.error = error;
        }
    }
}
