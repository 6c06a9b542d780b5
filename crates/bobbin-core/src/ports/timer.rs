//! TimerService port - delayed callbacks (retry backoff, attempt timeouts).
//!
//! The queue only needs `arm` and `cancel`, so tests can swap in a wrapper
//! that records delays, and timing can be driven by tokio's paused clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;

pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Opaque handle for one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// TimerService arms one-shot callbacks.
///
/// `arm` must never run the callback before returning: the queue arms timers
/// while it holds its state lock.
/// `cancel` on a timer that already fired is a no-op.
pub trait TimerService: Send + Sync {
    fn arm(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
    fn cancel(&self, handle: TimerHandle);
}

/// Timers backed by `tokio::time::sleep` on spawned tasks.
pub struct TokioTimer {
    runtime: Handle,
    next_id: AtomicU64,
    armed: Arc<Mutex<HashMap<u64, AbortHandle>>>,
}

impl TokioTimer {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            armed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of timers armed and neither fired nor cancelled.
    pub fn active(&self) -> usize {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl TimerService for TokioTimer {
    fn arm(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let armed = Arc::clone(&self.armed);
        let deadline = Instant::now().checked_add(delay);

        // Hold the map lock across spawn + insert so the task cannot look
        // itself up before it is registered.
        let mut guard = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        let join = self.runtime.spawn(async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
            let still_armed = armed
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id)
                .is_some();
            if still_armed {
                callback();
            }
        });
        guard.insert(id, join.abort_handle());

        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let removed = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0);
        if let Some(abort) = removed {
            abort.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, abort) in armed.drain() {
            abort.abort();
        }
    }
}
