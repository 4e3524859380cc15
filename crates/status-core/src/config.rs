//! statusd.toml configuration parser.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::error::{ConfigError, ConfigResult};
use crate::schedule::Schedule;
use crate::types::{DEFAULT_METHOD, DEFAULT_SCHEDULE, HttpProbeSpec, OverlapPolicy, ProbeConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub states: StatesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Address for the `/metrics` endpoint; no listener when absent.
    pub metrics_listen: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            metrics_listen: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatesConfig {
    #[serde(default)]
    pub http: Vec<HttpStateConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpStateConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schedule", alias = "cron")]
    pub schedule: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    pub timeout: Option<String>,
    #[serde(default, alias = "values")]
    pub attributes: BTreeMap<String, String>,
}

impl HttpStateConfig {
    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig::new(&self.name, &self.description, &self.schedule)
    }

    pub fn probe_spec(&self) -> ConfigResult<HttpProbeSpec> {
        let timeout = self
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(|source| ConfigError::Timeout {
                name: self.name.clone(),
                source,
            })?;

        Ok(HttpProbeSpec {
            method: self.method.clone(),
            url: self.url.clone(),
            attributes: self.attributes.clone(),
            timeout,
        })
    }
}

impl StatusConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check names, schedules and timeouts of every state.
    ///
    /// Probe-type specifics such as URL syntax are checked when the probe
    /// is built.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for (index, state) in self.states.http.iter().enumerate() {
            if state.name.trim().is_empty() {
                return Err(ConfigError::EmptyName { index });
            }
            if !seen.insert(state.name.as_str()) {
                return Err(ConfigError::DuplicateName(state.name.clone()));
            }
            Schedule::parse(&state.schedule).map_err(|source| ConfigError::Schedule {
                name: state.name.clone(),
                source,
            })?;
            state.probe_spec()?;
        }
        Ok(())
    }

    pub fn state_count(&self) -> usize {
        self.states.http.len()
    }
}

fn default_service_name() -> String {
    "statusd".to_string()
}

fn default_schedule() -> String {
    DEFAULT_SCHEDULE.to_string()
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const FULL: &str = r#"
[telemetry]
service_name = "edge-checks"
metrics_listen = "127.0.0.1:9464"

[scheduler]
overlap = "skip"

[[states.http]]
name = "shop"
description = "Shop front page"
schedule = "*/5 * * * *"
method = "HEAD"
url = "https://shop.example.com/"
timeout = "15s"

[states.http.attributes]
"deployment.environment" = "prod"
team = "web"

[[states.http]]
name = "api"
url = "http://api.example.com/healthz"
"#;

    #[test]
    fn parse_full() {
        let config = StatusConfig::from_toml(FULL).unwrap();
        assert_eq!(config.telemetry.service_name, "edge-checks");
        assert_eq!(
            config.telemetry.metrics_listen.as_deref(),
            Some("127.0.0.1:9464")
        );
        assert_eq!(config.scheduler.overlap, OverlapPolicy::Skip);
        assert_eq!(config.state_count(), 2);

        let shop = &config.states.http[0];
        assert_eq!(shop.method, "HEAD");
        let spec = shop.probe_spec().unwrap();
        assert_eq!(spec.timeout, Some(Duration::from_secs(15)));
        assert_eq!(spec.attributes["team"], "web");
        assert_eq!(shop.probe_config().schedule, "*/5 * * * *");

        config.validate().unwrap();
    }

    #[test]
    fn parse_minimal_applies_defaults() {
        let config = StatusConfig::from_toml(
            r#"
[[states.http]]
name = "api"
url = "http://api.example.com"
"#,
        )
        .unwrap();
        assert_eq!(config.telemetry.service_name, "statusd");
        assert!(config.telemetry.metrics_listen.is_none());
        assert_eq!(config.scheduler.overlap, OverlapPolicy::Concurrent);

        let api = &config.states.http[0];
        assert_eq!(api.schedule, "@10m");
        assert_eq!(api.method, "GET");
        assert!(api.description.is_empty());
        assert!(api.timeout.is_none());
    }

    #[test]
    fn cron_and_values_aliases() {
        let config = StatusConfig::from_toml(
            r#"
[[states.http]]
name = "legacy"
cron = "@30s"
url = "http://legacy.example.com"
values = { owner = "ops" }
"#,
        )
        .unwrap();
        let legacy = &config.states.http[0];
        assert_eq!(legacy.schedule, "@30s");
        assert_eq!(legacy.attributes["owner"], "ops");
    }

    #[test]
    fn validate_rejects_empty_name() {
        let config = StatusConfig::from_toml(
            r#"
[[states.http]]
name = " "
url = "http://a.example.com"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyName { index: 0 })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let config = StatusConfig::from_toml(
            r#"
[[states.http]]
name = "a"
url = "http://a.example.com"

[[states.http]]
name = "a"
url = "http://b.example.com"
"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateName(n)) if n == "a"));
    }

    #[test]
    fn validate_rejects_bad_schedule() {
        let config = StatusConfig::from_toml(
            r#"
[[states.http]]
name = "a"
schedule = "@soon"
url = "http://a.example.com"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Schedule { name, .. }) if name == "a"
        ));
    }

    #[test]
    fn validate_rejects_bad_timeout() {
        let config = StatusConfig::from_toml(
            r#"
[[states.http]]
name = "a"
url = "http://a.example.com"
timeout = "forever"
"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Timeout { .. })));
    }

    #[test]
    fn missing_url_is_a_parse_error() {
        let err = StatusConfig::from_toml(
            r#"
[[states.http]]
name = "a"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn from_file_reads_and_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = StatusConfig::from_file(file.path()).unwrap();
        assert_eq!(config.state_count(), 2);

        let missing = Path::new("/definitely/not/here/statusd.toml");
        assert!(matches!(
            StatusConfig::from_file(missing),
            Err(ConfigError::Read { .. })
        ));
    }
}
