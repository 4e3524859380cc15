//! Telemetry error types.

use thiserror::Error;

/// Result type alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    #[error("invalid attribute key {0:?}")]
    InvalidAttributeKey(String),

    #[error("instrument {name:?} already registered as {existing}, requested {requested}")]
    InstrumentConflict {
        name: String,
        existing: &'static str,
        requested: &'static str,
    },
}
