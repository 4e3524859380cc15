//! statusd: the status probe daemon.
//!
//! Single binary that wires the probe engine together:
//! - Configuration (TOML)
//! - Telemetry sink (log-backed tracer + in-process metrics registry)
//! - HTTP probes
//! - Scheduler
//! - `/metrics` and `/healthz` endpoints
//!
//! # Usage
//!
//! ```text
//! statusd --config /etc/statusd/statusd.toml --metrics-listen 0.0.0.0:9464
//! ```

mod engine;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use status_core::StatusConfig;
use status_telemetry::{LogTracer, MetricsRegistry, Telemetry};

const DEFAULT_LOG_FILTER: &str = "info,statusd=debug,status=debug";

#[derive(Parser)]
#[command(name = "statusd", version, about = "Scheduled endpoint probes")]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "statusd.toml")]
    config: PathBuf,

    /// Serve `/metrics` on this address; overrides `telemetry.metrics_listen`.
    #[arg(long)]
    metrics_listen: Option<SocketAddr>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = StatusConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config
        .validate()
        .with_context(|| format!("validating {}", cli.config.display()))?;

    run(config, cli.metrics_listen).await
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(config: StatusConfig, metrics_listen: Option<SocketAddr>) -> anyhow::Result<()> {
    info!(
        service = %config.telemetry.service_name,
        states = config.state_count(),
        "statusd starting"
    );

    // ── Telemetry ──────────────────────────────────────────────

    let registry = MetricsRegistry::new();
    let telemetry = Telemetry::new(
        Arc::new(LogTracer::new(&config.telemetry.service_name)),
        Arc::new(registry.clone()),
    );

    // ── Probes ─────────────────────────────────────────────────

    let scheduler = engine::build_scheduler(&config, &telemetry)?;
    info!(probes = scheduler.len(), overlap = ?scheduler.overlap(), "probes registered");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background tasks ───────────────────────────────────────

    let scheduler_handle = tokio::spawn(scheduler.run_until(shutdown_rx.clone()));

    let listen = match metrics_listen {
        Some(addr) => Some(addr),
        None => config
            .telemetry
            .metrics_listen
            .as_deref()
            .map(str::parse::<SocketAddr>)
            .transpose()
            .context("parsing telemetry.metrics_listen")?,
    };

    let server_handle = match listen {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding metrics listener on {addr}"))?;
            info!(%addr, "metrics server starting");

            let router = server::build_router(registry);
            let mut server_shutdown = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = server_shutdown.wait_for(|stop| *stop).await;
                    })
                    .await
            }))
        }
        None => None,
    };

    // Graceful shutdown on Ctrl-C.
    tokio::signal::ctrl_c()
        .await
        .context("installing Ctrl-C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    scheduler_handle.await?;
    if let Some(handle) = server_handle {
        handle.await??;
    }

    info!("statusd stopped");
    Ok(())
}
