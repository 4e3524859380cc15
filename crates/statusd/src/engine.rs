//! Builds probes from configuration and registers them.

use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use status_core::StatusConfig;
use status_probe::HttpProbe;
use status_scheduler::Scheduler;
use status_telemetry::Telemetry;

/// One probe per configured state, registered on its schedule.
///
/// Any construction or schedule error aborts startup.
pub fn build_scheduler(config: &StatusConfig, telemetry: &Telemetry) -> anyhow::Result<Scheduler> {
    let mut scheduler = Scheduler::new().with_overlap(config.scheduler.overlap);

    for state in &config.states.http {
        let spec = state.probe_spec()?;
        let probe = HttpProbe::new(state.probe_config(), spec, telemetry)
            .with_context(|| format!("building http probe {}", state.name))?;
        debug!(probe = %state.name, method = %probe.method(), url = %probe.url(), "http probe built");
        scheduler
            .register_probe(Arc::new(probe))
            .with_context(|| format!("registering http probe {}", state.name))?;
    }

    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use status_telemetry::RecordingSink;

    fn build(toml: &str) -> anyhow::Result<Scheduler> {
        let config = StatusConfig::from_toml(toml)?;
        let sink = RecordingSink::new();
        build_scheduler(&config, &Telemetry::recording(&sink))
    }

    #[test]
    fn example_config_builds() {
        let config = StatusConfig::from_toml(include_str!("../statusd.example.toml")).unwrap();
        config.validate().unwrap();

        let sink = RecordingSink::new();
        let scheduler = build_scheduler(&config, &Telemetry::recording(&sink)).unwrap();
        assert_eq!(scheduler.probe_names(), vec!["example", "example-api"]);
    }

    #[test]
    fn overlap_policy_carried_over() {
        let scheduler = build(
            r#"
            [scheduler]
            overlap = "skip"
            "#,
        )
        .unwrap();
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.overlap(), status_core::OverlapPolicy::Skip);
    }

    #[test]
    fn bad_url_names_the_probe() {
        let err = build(
            r#"
            [[states.http]]
            name = "broken"
            url = "not a url"
            "#,
        )
        .err().unwrap();
        let message = format!("{err:#}");
        assert!(message.contains("building http probe broken"), "{message}");
    }

    #[test]
    fn bad_schedule_aborts() {
        let err = build(
            r#"
            [[states.http]]
            name = "nightly"
            schedule = "0 3 * *"
            url = "https://example.com/"
            "#,
        )
        .err().unwrap();
        let message = format!("{err:#}");
        assert!(message.contains("registering http probe nightly"), "{message}");
    }

    #[test]
    fn bad_timeout_aborts() {
        let err = build(
            r#"
            [[states.http]]
            name = "slow"
            url = "https://example.com/"
            timeout = "30"
            "#,
        )
        .err().unwrap();
        assert!(format!("{err:#}").contains("slow"));
    }
}
