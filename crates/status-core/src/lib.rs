//! status-core: shared types for the statusd probe engine.
//!
//! Holds the immutable probe descriptions handed to the engine, the
//! schedule grammar used to fire them, and the TOML configuration file
//! that produces both.
//!
//! # Schedules
//!
//! ```text
//! "@10m"          → Schedule::Every(10 minutes), first firing 10m after registration
//! "*/5 * * * *"   → Schedule::Cron, 5 fields, minute granularity
//! "30 * * * * *"  → Schedule::Cron, 6 fields, leading seconds
//! ```

pub mod config;
pub mod duration;
pub mod error;
pub mod schedule;
pub mod types;

pub use config::{HttpStateConfig, SchedulerConfig, StatesConfig, StatusConfig, TelemetryConfig};
pub use duration::parse_duration;
pub use error::{ConfigError, ConfigResult, DurationError, ScheduleError};
pub use schedule::{CronSchedule, DURATION_SENTINEL, Schedule};
pub use types::*;
