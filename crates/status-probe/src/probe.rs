//! The capability every probe type exposes to the scheduler.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use status_core::ProbeConfig;

use crate::error::ProbeError;

/// Span attribute naming the probe type.
pub const PLUGIN_NAME_KEY: &str = "status.plugin.name";

/// How an execution that reached its target ended.
///
/// Executions that never reached the target are reported as
/// [`ProbeError`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    /// Well-formed response carrying an error-range status.
    HttpError,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Success => f.write_str("success"),
            ProbeOutcome::HttpError => f.write_str("http-error"),
        }
    }
}

/// Result of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub outcome: ProbeOutcome,
    /// Request start to response fully received.
    pub elapsed: Duration,
    pub status_code: Option<u16>,
}

/// A unit of work that checks one external target.
#[async_trait]
pub trait Probe: Send + Sync {
    fn config(&self) -> &ProbeConfig;

    /// Probe type tag, e.g. "http".
    fn kind(&self) -> &'static str;

    /// Check the target once, emitting one span and its measurements.
    async fn execute(&self) -> Result<ProbeResult, ProbeError>;
}
