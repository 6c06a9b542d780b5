//! Terminal-event listeners.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use super::TaskRecord;

pub(crate) type Listener = Arc<dyn Fn(&TaskRecord) + Send + Sync>;

/// Ordered observer lists for completed and failed tasks.
#[derive(Default)]
pub(crate) struct Listeners {
    complete: Mutex<Vec<Listener>>,
    failed: Mutex<Vec<Listener>>,
}

impl Listeners {
    pub fn on_complete(&self, listener: Listener) {
        lock(&self.complete).push(listener);
    }

    pub fn on_failed(&self, listener: Listener) {
        lock(&self.failed).push(listener);
    }

    pub fn emit_complete(&self, record: &TaskRecord) {
        let listeners = lock(&self.complete).clone();
        notify(&listeners, record, "complete");
    }

    /// Fired for both Failed and TimedOut.
    pub fn emit_failed(&self, record: &TaskRecord) {
        let listeners = lock(&self.failed).clone();
        notify(&listeners, record, "failed");
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// The list is cloned out first so a listener may register another listener.
fn notify(listeners: &[Listener], record: &TaskRecord, event: &'static str) {
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener(record))).is_err() {
            warn!(task_id = %record.id, event, "task listener panicked");
        }
    }
}
