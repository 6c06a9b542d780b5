//! QueueBuilder - キューの構築とポートのワイヤリング
//!
//! 設定の検証は build() で一度だけ行います（Fail-fast）。
//! 差し替えなかったポートにはデフォルト実装が入ります。

use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::debug;

use super::events::Listeners;
use super::scheduler::{Inner, QueueState};
use super::{QueueConfig, TaskQueue};
use crate::domain::QueueError;
use crate::ports::{Clock, IdGenerator, TimerService, TokioClock, TokioTimer, UlidGenerator};

/// QueueBuilder は TaskQueue を構築
///
/// # 使用例
/// ```ignore
/// let queue = QueueBuilder::new(config)
///     .clock(Arc::new(FixedClock::new(at)))
///     .build()?;
/// ```
pub struct QueueBuilder {
    config: QueueConfig,
    timer: Option<Arc<dyn TimerService>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    runtime: Option<Handle>,
}

impl QueueBuilder {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            timer: None,
            clock: None,
            ids: None,
            runtime: None,
        }
    }

    /// Timer used for retry backoff and attempt timeouts. Default: `TokioTimer`.
    pub fn timer(mut self, timer: Arc<dyn TimerService>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Clock for record timestamps. Default: `TokioClock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Default: `UlidGenerator` over the queue's clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Runtime that runs handler attempts. Default: the current runtime.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validate the config and build the queue.
    ///
    /// # Errors
    /// - `InvalidConcurrency` when `max_concurrency` is 0
    /// - `NoRuntime` when no runtime was given and none is current
    pub fn build(self) -> Result<TaskQueue, QueueError> {
        self.config.validate()?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| QueueError::NoRuntime)?,
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(TokioClock::new()) as Arc<dyn Clock>);
        let ids = self.ids.unwrap_or_else(|| {
            Arc::new(UlidGenerator::new(Arc::clone(&clock))) as Arc<dyn IdGenerator>
        });
        let timer = self.timer.unwrap_or_else(|| {
            Arc::new(TokioTimer::new(runtime.clone())) as Arc<dyn TimerService>
        });

        debug!(config = ?self.config, "task queue built");

        let inner = Inner {
            retry_policy: self.config.retry_policy(),
            config: self.config,
            state: Mutex::new(QueueState::default()),
            listeners: Listeners::default(),
            timer,
            clock,
            ids,
            runtime,
            idle: Notify::new(),
        };
        Ok(TaskQueue::from_inner(Arc::new(inner)))
    }
}
