//! Error types for configuration and schedule parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced while parsing a duration string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { input: String, unit: String },

    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("duration {0:?} overflows")]
    Overflow(String),
}

/// A schedule string that is neither a valid sentinel duration nor a
/// valid cron expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("empty schedule")]
    Empty,

    #[error("invalid interval in schedule {schedule:?}: {source}")]
    Duration {
        schedule: String,
        #[source]
        source: DurationError,
    },

    #[error("interval in schedule {0:?} must be greater than zero")]
    ZeroInterval(String),

    #[error("cron expression {expression:?} has {fields} fields, expected 5 or 6")]
    CronFields { expression: String, fields: usize },

    #[error("invalid cron expression {expression:?}: {message}")]
    Cron { expression: String, message: String },
}

/// Errors that can occur while loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("state #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate state name: {0}")]
    DuplicateName(String),

    #[error("state {name:?}: {source}")]
    Schedule {
        name: String,
        #[source]
        source: ScheduleError,
    },

    #[error("state {name:?}: invalid timeout: {source}")]
    Timeout {
        name: String,
        #[source]
        source: DurationError,
    },
}
