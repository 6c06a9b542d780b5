use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::TaskError;

/// The work behind a task.
///
/// The queue hands the same `Arc<Value>` to every attempt, so a handler can
/// read the payload but never mutate what the queue holds.
/// A returned `Err` and a panic are both treated as a failed attempt.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, data: Arc<Value>) -> Result<Value, TaskError>;
}

/// Adapter that turns an async closure into a [`TaskHandler`].
pub struct FnHandler<F> {
    f: F,
}

/// Build a handler from a closure.
///
/// ```ignore
/// let spec = TaskSpec::new(handler_fn(|data| async move {
///     Ok(serde_json::json!({ "echo": *data }))
/// }));
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Arc<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(Arc<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, TaskError>> + Send + 'static,
{
    async fn handle(&self, data: Arc<Value>) -> Result<Value, TaskError> {
        (self.f)(data).await
    }
}
