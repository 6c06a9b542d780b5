//! Execution wrapper: runs one attempt, settles it, schedules retries.
//!
//! Each attempt is tagged with `(task id, attempt number)`. Handler
//! completion and the timeout timer both settle with that tag, and only the
//! first settlement that still matches the running attempt is applied.

use std::any::Any;
use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::task::JoinError;
use tracing::{debug, warn};

use super::scheduler::Inner;
use super::{RetryArrival, TaskRecord, TaskStatus};
use crate::domain::{TaskError, TaskId};
use crate::handler::TaskHandler;
use crate::ports::TimerCallback;

/// An attempt that has been started under the lock and must be spawned.
pub(crate) struct Launch {
    pub id: TaskId,
    pub attempt: u32,
    pub handler: Arc<dyn TaskHandler>,
    pub data: Arc<Value>,
}

#[derive(Debug)]
pub(crate) enum Settlement {
    Completed(Value),
    Failed(TaskError),
    TimedOut,
}

enum Terminal {
    Completed(TaskRecord),
    Failed(TaskRecord),
}

impl Inner {
    pub(crate) fn launch(self: &Arc<Self>, launch: Launch) {
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            let Launch {
                id,
                attempt,
                handler,
                data,
            } = launch;

            // The handler gets its own task so a panic surfaces as a JoinError.
            let outcome = inner
                .runtime
                .spawn(async move { handler.handle(data).await })
                .await;

            let settlement = match outcome {
                Ok(Ok(value)) => Settlement::Completed(value),
                Ok(Err(err)) => Settlement::Failed(err),
                Err(join_err) => Settlement::Failed(join_error_to_task_error(join_err)),
            };
            inner.settle(id, attempt, settlement);
        });
    }

    pub(crate) fn settle(self: &Arc<Self>, id: TaskId, attempt: u32, settlement: Settlement) {
        let now = self.clock.now();
        let terminal = {
            let mut guard = self.lock_state();
            let state = &mut *guard;

            let Some(entry) = state.entries.get_mut(&id) else {
                debug!(task_id = %id, attempt, "settlement for unknown task discarded");
                return;
            };
            if entry.record.status.is_terminal() {
                debug!(
                    task_id = %id,
                    attempt,
                    status = ?entry.record.status,
                    ?settlement,
                    "settlement after terminal status discarded"
                );
                return;
            }
            if !state.running.contains(&id)
                || entry.record.status != TaskStatus::Running
                || entry.record.attempts != attempt
            {
                debug!(task_id = %id, attempt, ?settlement, "stale settlement discarded");
                return;
            }

            state.running.remove(&id);
            if let Some(handle) = state.timeout_timers.remove(&id) {
                self.timer.cancel(handle);
            }

            match settlement {
                Settlement::Completed(value) => {
                    entry.record.mark_completed(value, now);
                    debug!(task_id = %id, attempt, "task completed");
                    Some(Terminal::Completed(entry.record.clone()))
                }
                failure if entry.record.has_retry_left() && !state.disposed => {
                    let delay = self.retry_policy.next_delay(attempt);
                    let (error, timed_out) = match failure {
                        Settlement::Failed(err) => (Some(err), false),
                        _ => (None, true),
                    };
                    entry.record.schedule_retry(error);

                    let handle = self.timer.arm(delay, self.readmit_callback(id, attempt));
                    state.retry_timers.insert(id, handle);
                    debug!(
                        task_id = %id,
                        attempt,
                        timed_out,
                        delay_ms = delay.as_millis() as u64,
                        "retry scheduled"
                    );
                    None
                }
                Settlement::Failed(err) => {
                    warn!(task_id = %id, attempts = attempt, error = %err, "task failed");
                    entry.record.mark_failed(err, now);
                    Some(Terminal::Failed(entry.record.clone()))
                }
                Settlement::TimedOut => {
                    warn!(task_id = %id, attempts = attempt, "task timed out");
                    entry.record.mark_timed_out(now);
                    Some(Terminal::Failed(entry.record.clone()))
                }
            }
        };

        match terminal {
            Some(Terminal::Completed(record)) => self.listeners.emit_complete(&record),
            Some(Terminal::Failed(record)) => self.listeners.emit_failed(&record),
            None => {}
        }
        self.dispatch();
        self.idle.notify_waiters();
    }

    /// Put a task whose backoff elapsed back into the pending order.
    pub(crate) fn readmit(self: &Arc<Self>, id: TaskId, attempt: u32) {
        {
            let mut state = self.lock_state();
            if state.retry_timers.remove(&id).is_none() {
                // Cleared or disposed while the timer was armed.
                return;
            }
            let Some(entry) = state.entries.get(&id) else {
                return;
            };
            if entry.record.status != TaskStatus::Pending || entry.record.attempts != attempt {
                return;
            }
            let (priority, original_seq) = (entry.record.priority, entry.seq);

            let seq = match self.config.retry_arrival {
                RetryArrival::Fresh => state.take_seq(),
                RetryArrival::Original => original_seq,
            };
            state.pending.push(priority, seq, id);
            debug!(task_id = %id, next_attempt = attempt + 1, "task readmitted");
        }
        self.dispatch();
    }

    fn readmit_callback(self: &Arc<Self>, id: TaskId, attempt: u32) -> TimerCallback {
        let weak: Weak<Self> = Arc::downgrade(self);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.readmit(id, attempt);
            }
        })
    }
}

fn join_error_to_task_error(err: JoinError) -> TaskError {
    match err.try_into_panic() {
        Ok(payload) => TaskError::panicked(panic_message(payload.as_ref())),
        Err(_) => TaskError::new("handler task was cancelled"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked with a non-string payload".to_string()
    }
}
