//! Queue module: task records, ordering, dispatch, retries, and lifecycle.

mod builder;
mod config;
mod events;
mod execution;
mod pending;
mod record;
mod retry;
mod scheduler;
mod state;
mod stats;


pub use builder::QueueBuilder;
pub use config::{QueueConfig, RetryArrival};
pub use record::TaskRecord;
pub use retry::RetryPolicy;
pub use scheduler::TaskQueue;
pub use state::TaskStatus;
pub use stats::QueueStats;
