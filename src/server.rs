//! HTTP Server and Polling Loops
//!
//! This module wires the collectors to their polling loops and exposes the shared
//! registry over HTTP.
//!
//! # Architecture
//!
//! - **HTTP Server**: Axum-based server exposing `/metrics`, `/health`, and `/` endpoints
//! - **Polling Loops**: one background task per enabled subsystem (RAID, NVMe)
//! - **State Management**: the metrics collector is cloned into every task; gauge
//!   families lock internally, so a scrape never races a reconcile
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /health` - 200 if any enabled collector's last poll succeeded, 503 otherwise
//!
//! # Polling
//!
//! Each loop ticks every `poll_interval_seconds`. Within a loop, cycles never overlap:
//! the next tick is only awaited once the current fetch-parse-reconcile finishes.
//! A failed cycle is logged and leaves the previously exported series untouched.

use crate::collectors::{CollectionStatus, Collector, NvmeCollector, RaidCollector};
use crate::config::Config;
use crate::error::ExporterError;
use crate::metrics::MetricsCollector;
use crate::tools::{
    CommandExecutor, LsblkDiscovery, RaidClient, SmartClient, SystemCommandExecutor,
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

#[derive(Clone)]
struct AppState {
    metrics: MetricsCollector,
    collectors: Arc<Vec<&'static str>>,
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let metrics = MetricsCollector::new()?;
    let collectors = spawn_collectors(&config, &metrics);
    if collectors.is_empty() {
        warn!("All collectors are disabled; only empty metrics will be served");
    }

    let app = router(metrics, collectors);

    // Start the server
    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::Server(format!("failed to bind {}: {}", addr, e)))?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP routes over a shared registry.
///
/// `collectors` names the enabled subsystems that `/health` reports on.
pub fn router(metrics: MetricsCollector, collectors: Vec<&'static str>) -> Router {
    let state = AppState {
        metrics,
        collectors: Arc::new(collectors),
    };

    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start one polling task per enabled subsystem and return their names.
fn spawn_collectors(config: &Config, metrics: &MetricsCollector) -> Vec<&'static str> {
    let executor: Arc<dyn CommandExecutor> =
        Arc::new(SystemCommandExecutor::new(config.commands.timeout()));
    let poll_interval = config.metrics.poll_interval();
    let grace = config.metrics.absence_grace();
    let mut names = Vec::new();

    if config.metrics.collect_raid_metrics {
        let client = RaidClient::new(executor.clone(), config.commands.racadm.clone());
        let collector = RaidCollector::new(client, metrics.clone(), grace);
        names.push(collector.name());
        tokio::spawn(run_collector_loop(collector, poll_interval, metrics.clone()));
    }

    if config.metrics.collect_nvme_metrics {
        let discovery = Arc::new(LsblkDiscovery::new(
            executor.clone(),
            config.commands.lsblk.clone(),
        ));
        let client = SmartClient::new(executor, config.commands.nvme.clone());
        let collector = NvmeCollector::new(discovery, client, metrics.clone(), grace);
        names.push(collector.name());
        tokio::spawn(run_collector_loop(collector, poll_interval, metrics.clone()));
    }

    names
}

/// Drive a collector forever, one cycle per tick.
pub async fn run_collector_loop<C: Collector>(
    mut collector: C,
    poll_interval: Duration,
    metrics: MetricsCollector,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Polling {} every {}s",
        collector.name(),
        poll_interval.as_secs()
    );

    loop {
        ticker.tick().await;
        poll_once(&mut collector, &metrics).await;
    }
}

/// Run a single cycle and record its outcome on `collector_up`.
pub async fn poll_once<C: Collector>(
    collector: &mut C,
    metrics: &MetricsCollector,
) -> CollectionStatus {
    let status = collector.collect(Instant::now()).await;
    metrics.record_poll(collector.name(), status == CollectionStatus::Success);
    status
}

async fn root_handler() -> impl IntoResponse {
    r#"<html>
<head><title>Dell Disk Exporter</title></head>
<body>
<h1>Dell Disk Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(metrics) => metrics.into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state
        .collectors
        .iter()
        .any(|name| state.metrics.collector_is_up(name));

    if healthy {
        (axum::http::StatusCode::OK, "OK")
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "No collector has completed a successful poll",
        )
    }
}
