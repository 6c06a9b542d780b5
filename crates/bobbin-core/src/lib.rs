//! bobbin-core
//!
//! In-process asynchronous priority task queue.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, priority, enqueue spec, errors）
//! - **handler**: タスク本体の trait（TaskHandler）とクロージャ用アダプタ
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, TimerService）
//! - **queue**: スケジューラ本体（TaskQueue, 設定, レコード, リトライ, 統計）
//!
//! # 使用例
//! ```ignore
//! let queue = TaskQueue::new(QueueConfig::default())?;
//! queue.on_task_failed(|record| eprintln!("{} failed: {:?}", record.id, record.error));
//! let id = queue.enqueue(
//!     TaskSpec::new(handler_fn(|data| async move { Ok(json!({ "echo": *data })) }))
//!         .data(json!("hi"))
//!         .priority(1),
//! )?;
//! queue.idle().await;
//! ```

pub mod domain;
pub mod handler;
pub mod ports;
pub mod queue;

pub use domain::{ErrorKind, Priority, QueueError, TaskError, TaskId, TaskOptions, TaskSpec};
pub use handler::{FnHandler, TaskHandler, handler_fn};
pub use queue::{
    QueueBuilder, QueueConfig, QueueStats, RetryArrival, RetryPolicy, TaskQueue, TaskRecord,
    TaskStatus,
};
