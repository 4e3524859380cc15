//! Probe descriptions handed to the engine.
//!
//! These are created once at startup and never mutated afterwards.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::schedule::Schedule;

/// Schedule used when a state omits one.
pub const DEFAULT_SCHEDULE: &str = "@10m";

/// HTTP method used when a state omits one.
pub const DEFAULT_METHOD: &str = "GET";

/// Immutable description of one scheduled check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Unique display name, also used as a metric label.
    pub name: String,
    /// Free text.
    pub description: String,
    /// Sentinel interval (`@10m`) or cron expression.
    pub schedule: String,
}

impl ProbeConfig {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schedule: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schedule: schedule.into(),
        }
    }

    /// Parse the configured schedule.
    pub fn parse_schedule(&self) -> Result<Schedule, ScheduleError> {
        Schedule::parse(&self.schedule)
    }
}

/// HTTP-specific probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProbeSpec {
    /// HTTP verb.
    pub method: String,
    /// Absolute target URL, parsed when the probe is built.
    pub url: String,
    /// Attached to every span and measurement, ordered by key.
    pub attributes: BTreeMap<String, String>,
    /// Per-request timeout covering the request and body read.
    pub timeout: Option<Duration>,
}

impl HttpProbeSpec {
    /// A GET probe against `url` with no extra attributes.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: DEFAULT_METHOD.to_string(),
            url: url.into(),
            attributes: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// What the scheduler does when a probe's next firing arrives while the
/// previous one is still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Fire anyway; executions of the same probe may overlap.
    #[default]
    Concurrent,
    /// Drop the new firing.
    Skip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_schedule_parses() {
        let config = ProbeConfig::new("a", "", "@5m");
        assert_eq!(
            config.parse_schedule().unwrap().interval(),
            Some(Duration::from_secs(300))
        );
        assert!(ProbeConfig::new("a", "", "@5").parse_schedule().is_err());
    }

    #[test]
    fn http_spec_defaults_to_get() {
        let spec = HttpProbeSpec::new("https://example.com");
        assert_eq!(spec.method, "GET");
        assert!(spec.attributes.is_empty());
        assert!(spec.timeout.is_none());
    }

    #[test]
    fn http_spec_attributes_are_ordered() {
        let spec = HttpProbeSpec::new("https://example.com")
            .with_attribute("zone", "eu")
            .with_attribute("app", "shop");
        let keys: Vec<_> = spec.attributes.keys().cloned().collect();
        assert_eq!(keys, vec!["app", "zone"]);
    }
}
