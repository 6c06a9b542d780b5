use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{Duration, sleep};
use tracing::info;

use bobbin_core::{QueueConfig, TaskError, TaskHandler, TaskId, TaskQueue, TaskSpec, handler_fn};

#[derive(Debug, Deserialize)]
struct HelloPayload {
    name: String,
}

/// Fails the first `n` attempts, then greets.
struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl TaskHandler for HelloHandler {
    async fn handle(&self, data: Arc<Value>) -> Result<Value, TaskError> {
        let p = HelloPayload::deserialize(&*data)
            .map_err(|e| TaskError::new(format!("json decode: {e}")))?;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(TaskError::new(format!("intentional failure (left={left})")));
        }

        println!("Hello, {}!", p.name);
        Ok(json!({ "greeted": p.name }))
    }
}

/// 設定ファイル（JSON）があれば読み、なければデモ向けの短い backoff を使う
fn load_config() -> Result<QueueConfig, Box<dyn Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            Ok(QueueConfig::from_json_str(&raw)?)
        }
        None => Ok(QueueConfig {
            max_concurrency: 2,
            retry_base_delay_ms: 200,
            ..QueueConfig::default()
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // (A) Queue を用意
    let config = load_config()?;
    info!(?config, "starting demo queue");
    let queue = TaskQueue::new(config)?;

    queue.on_task_complete(|record| {
        println!("completed: id={} attempts={}", record.id, record.attempts);
    });
    queue.on_task_failed(|record| {
        println!(
            "gave up: id={} status={:?} error={:?}",
            record.id, record.status, record.error
        );
    });

    // (B) 2 回失敗してから成功する hello タスク
    let hello = queue.enqueue(
        TaskSpec::new(HelloHandler::new(2))
            .data(json!({ "name": "bobbin" }))
            .max_retries(5),
    )?;

    // (C) 一時停止中にまとめて投入 → resume で priority 順に流れる
    queue.pause();
    let mut batch: Vec<TaskId> = Vec::new();
    for (label, priority) in [("low", 5), ("mid", 3), ("urgent", 1), ("mid-2", 3)] {
        let id = queue.enqueue(
            TaskSpec::new(handler_fn(move |_| async move {
                println!("running {label} (priority {priority})");
                sleep(Duration::from_millis(50)).await;
                Ok(json!(label))
            }))
            .priority(priority),
        )?;
        batch.push(id);
    }
    let slow = queue.enqueue(
        TaskSpec::new(handler_fn(|_| async {
            sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }))
        .timeout(Duration::from_millis(300))
        .max_retries(0),
    )?;
    queue.resume();

    // (D) 全部終わるまで待つ
    queue.idle().await;

    // (E) 結果を表示
    for id in std::iter::once(hello).chain(batch).chain(std::iter::once(slow)) {
        if let Some(record) = queue.get_task(&id) {
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }
    println!("stats: {}", serde_json::to_string(&queue.stats())?);

    queue.dispose();
    Ok(())
}
