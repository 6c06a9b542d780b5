//! Ports - 外部依存（時刻・ID・タイマー）の抽象化
//!
//! queue はこれらの trait 越しにだけ外界に触れるので、テストでは
//! FixedClock や記録用タイマーに差し替えられます。

pub mod clock;
pub mod id_generator;
pub mod timer;

pub use self::clock::{Clock, FixedClock, SystemClock, TokioClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::timer::{TimerCallback, TimerHandle, TimerService, TokioTimer};
