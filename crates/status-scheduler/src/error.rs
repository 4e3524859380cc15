//! Scheduler error types.

use thiserror::Error;

use status_core::ScheduleError;

/// Errors that can occur while registering probes.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid schedule {schedule:?} for probe {name}: {source}")]
    InvalidSchedule {
        name: String,
        schedule: String,
        #[source]
        source: ScheduleError,
    },

    #[error("probe already registered: {0}")]
    AlreadyRegistered(String),

    #[error("probe name must not be empty")]
    EmptyName,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
