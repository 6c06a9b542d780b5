//! TaskQueue - admission, dispatch, and lifecycle.
//!
//! Every state transition is one critical section on `Inner::state` that
//! never awaits. Handler attempts are launched only after the lock is
//! released; timers are armed while it is held (`TimerService::arm` never
//! calls back synchronously).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info};

use super::events::Listeners;
use super::execution::{Launch, Settlement};
use super::pending::PendingStore;
use super::{QueueConfig, QueueStats, RetryPolicy, TaskRecord};
use crate::domain::{QueueError, TaskId, TaskSpec};
use crate::handler::TaskHandler;
use crate::ports::{Clock, IdGenerator, TimerHandle, TimerService};

/// Live bookkeeping for one task. The handler stays here, out of the snapshot.
pub(crate) struct TaskEntry {
    pub record: TaskRecord,
    pub handler: Arc<dyn TaskHandler>,
    pub timeout: Option<Duration>,
    /// Arrival sequence taken at enqueue.
    pub seq: u64,
}

#[derive(Default)]
pub(crate) struct QueueState {
    pub entries: HashMap<TaskId, TaskEntry>,
    pub pending: PendingStore,
    pub running: HashSet<TaskId>,
    pub retry_timers: HashMap<TaskId, TimerHandle>,
    pub timeout_timers: HashMap<TaskId, TimerHandle>,
    pub next_seq: u64,
    pub paused: bool,
    pub disposed: bool,
}

impl QueueState {
    pub fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub fn has_capacity(&self, max_concurrency: usize) -> bool {
        self.running.len() < max_concurrency
    }

    /// Nothing queued, nothing running, no retry timer armed.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running.is_empty() && self.retry_timers.is_empty()
    }

    /// Drop every Pending task, including those waiting on a retry timer.
    pub fn clear_pending(&mut self, timer: &dyn TimerService) -> usize {
        let mut removed = 0;
        for id in self.pending.drain() {
            if self.entries.remove(&id).is_some() {
                removed += 1;
            }
        }
        for (id, handle) in self.retry_timers.drain() {
            timer.cancel(handle);
            if self.entries.remove(&id).is_some() {
                removed += 1;
            }
        }
        removed
    }
}

pub(crate) struct Inner {
    pub config: QueueConfig,
    pub retry_policy: RetryPolicy,
    pub state: Mutex<QueueState>,
    pub listeners: Listeners,
    pub timer: Arc<dyn TimerService>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
    pub runtime: Handle,
    pub idle: Notify,
}

impl Inner {
    pub fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start as many pending tasks as the gate allows.
    pub fn dispatch(self: &Arc<Self>) {
        let launches = {
            let mut state = self.lock_state();
            self.start_ready(&mut state)
        };
        for launch in launches {
            self.launch(launch);
        }
    }

    fn start_ready(self: &Arc<Self>, state: &mut QueueState) -> Vec<Launch> {
        let mut launches = Vec::new();
        if state.paused || state.disposed {
            return launches;
        }

        while state.has_capacity(self.config.max_concurrency) {
            let Some(id) = state.pending.pop_head() else {
                break;
            };
            let Some(entry) = state.entries.get_mut(&id) else {
                continue;
            };

            let attempt = entry.record.start_attempt(self.clock.now());
            state.running.insert(id);
            debug!(task_id = %id, attempt, priority = %entry.record.priority, "attempt started");

            if let Some(timeout) = entry.timeout.or(self.config.default_timeout()) {
                let handle = self.timer.arm(timeout, self.timeout_callback(id, attempt));
                state.timeout_timers.insert(id, handle);
            }

            launches.push(Launch {
                id,
                attempt,
                handler: Arc::clone(&entry.handler),
                data: Arc::clone(&entry.record.data),
            });
        }
        launches
    }

    fn timeout_callback(self: &Arc<Self>, id: TaskId, attempt: u32) -> crate::ports::TimerCallback {
        let weak: Weak<Self> = Arc::downgrade(self);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.settle(id, attempt, Settlement::TimedOut);
            }
        })
    }
}

/// Handle to an in-process priority task queue.
///
/// Cloning is cheap; every clone drives the same queue.
///
/// # 使用例
/// ```ignore
/// let queue = TaskQueue::new(QueueConfig::default())?;
/// let id = queue.enqueue(TaskSpec::new(handler_fn(|_| async { Ok(json!("done")) })))?;
/// queue.idle().await;
/// assert_eq!(queue.get_task(&id).unwrap().status, TaskStatus::Completed);
/// ```
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

impl TaskQueue {
    /// Build a queue with the default ports. Must be called inside a tokio runtime.
    pub fn new(config: QueueConfig) -> Result<Self, QueueError> {
        super::QueueBuilder::new(config).build()
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    /// Validate and admit a task. Returns its id without waiting for it to run.
    pub fn enqueue(&self, spec: TaskSpec) -> Result<TaskId, QueueError> {
        if self.is_disposed() {
            return Err(QueueError::QueueDisposed);
        }
        let spec = spec.validate(self.inner.config.default_max_retries)?;

        let id = self.inner.ids.generate_task_id();
        let record = TaskRecord::new(
            id,
            spec.data,
            spec.priority,
            spec.max_retries,
            self.inner.clock.now(),
        );
        {
            let mut state = self.inner.lock_state();
            if state.disposed {
                return Err(QueueError::QueueDisposed);
            }
            let seq = state.take_seq();
            state.pending.push(spec.priority, seq, id);
            state.entries.insert(
                id,
                TaskEntry {
                    record,
                    handler: spec.handler,
                    timeout: spec.timeout,
                    seq,
                },
            );
        }
        debug!(task_id = %id, priority = %spec.priority, max_retries = spec.max_retries, "task enqueued");

        self.inner.dispatch();
        Ok(id)
    }

    /// Snapshot of a task, if the queue still knows it.
    pub fn get_task(&self, id: &TaskId) -> Option<TaskRecord> {
        self.inner
            .lock_state()
            .entries
            .get(id)
            .map(|entry| entry.record.clone())
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.inner.lock_state();
        QueueStats::tally(state.entries.values().map(|entry| entry.record.status))
    }

    /// Stop starting new attempts. Running attempts are unaffected.
    pub fn pause(&self) {
        self.inner.lock_state().paused = true;
        info!("queue paused");
    }

    pub fn resume(&self) {
        self.inner.lock_state().paused = false;
        info!("queue resumed");
        self.inner.dispatch();
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock_state().paused
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock_state().disposed
    }

    /// Remove every pending task (queued or waiting to retry).
    /// Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut state = self.inner.lock_state();
            state.clear_pending(self.inner.timer.as_ref())
        };
        info!(removed, "pending tasks cleared");
        self.inner.idle.notify_waiters();
        removed
    }

    /// Clear pending work, cancel all timers, and reject further enqueues.
    ///
    /// Running attempts may still finish and are recorded, but never retried.
    pub fn dispose(&self) {
        let (removed, timeouts) = {
            let mut state = self.inner.lock_state();
            if state.disposed {
                return;
            }
            state.disposed = true;
            let removed = state.clear_pending(self.inner.timer.as_ref());
            let timeouts = state.timeout_timers.len();
            for (_, handle) in state.timeout_timers.drain() {
                self.inner.timer.cancel(handle);
            }
            (removed, timeouts)
        };
        info!(removed, cancelled_timeouts = timeouts, "queue disposed");
        self.inner.idle.notify_waiters();
    }

    pub fn on_task_complete<F>(&self, listener: F)
    where
        F: Fn(&TaskRecord) + Send + Sync + 'static,
    {
        self.inner.listeners.on_complete(Arc::new(listener));
    }

    /// Called for tasks that end Failed or TimedOut.
    pub fn on_task_failed<F>(&self, listener: F)
    where
        F: Fn(&TaskRecord) + Send + Sync + 'static,
    {
        self.inner.listeners.on_failed(Arc::new(listener));
    }

    /// Wait until nothing is pending, running, or waiting to retry.
    ///
    /// Never resolves while the queue is paused with pending work.
    pub async fn idle(&self) {
        loop {
            let mut notified = std::pin::pin!(self.inner.idle.notified());
            notified.as_mut().enable();

            let idle = self.inner.lock_state().is_idle();
            if idle {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}
