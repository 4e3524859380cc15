//! status-scheduler: fires registered probes on their schedules.
//!
//! Every registered probe gets its own timeline. Firings of different
//! probes are independent and unordered; a failed firing is logged and the
//! probe keeps its schedule.
//!
//! # Architecture
//!
//! ```text
//! Scheduler::run_until(shutdown)
//!   └── one task per probe
//!       ├── Ticker
//!       │     ├── "@<duration>" → tokio interval, first tick one period after registration
//!       │     └── cron          → sleep until the next local wall-clock match
//!       └── JoinSet of firings → probe.execute()
//!             └── OverlapPolicy: Concurrent (default) or Skip while one is in flight
//! ```
//!
//! On shutdown no new firings start and in-flight firings run to
//! completion before `run_until` returns.

pub mod error;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::Scheduler;
