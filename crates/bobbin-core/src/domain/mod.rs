//! Domain model (ids, priority, enqueue specs, errors).

pub mod errors;
pub mod ids;
pub mod priority;
pub mod spec;

pub use self::errors::{ErrorKind, QueueError, TaskError};
pub use self::ids::{ParseIdError, TaskId};
pub use self::priority::Priority;
pub use self::spec::{TaskOptions, TaskSpec};
