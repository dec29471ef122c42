//! Prometheus Metrics Definitions
//!
//! This module defines every gauge family exposed by the exporter. Family names and
//! help strings are stable because dashboards key on them.
//!
//! # RAID (label: `vdisk`)
//! - `raid_status` - 1 when the controller reports `Ok`, else 0
//! - `raid_redundancy` - remaining redundancy
//! - `raid_size` - size in the unit the controller prints (usually GB)
//! - `raid_layout` - 1 when a layout was reported (the RAID level is not encoded)
//!
//! # NVMe
//! - `nvme_presence{device}` - 1 while visible, 0 during the absence grace period
//! - `nvme_health{device}` - 1 when `critical_warning` is 0
//! - `nvme_smart_log{device, metric}` - one series per numeric SMART log entry
//!
//! # Exporter
//! - `dell_disk_exporter_collector_up{collector}` - 1 if the last poll succeeded
//!
//! The registry is owned by the collector instance, never a process-wide default, so
//! independent instances (tests, for one) do not interfere.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Metrics collector for RAID and NVMe health
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    // RAID virtual disk metrics
    pub raid_status: Arc<GaugeVec>,
    pub raid_redundancy: Arc<GaugeVec>,
    pub raid_size: Arc<GaugeVec>,
    pub raid_layout: Arc<GaugeVec>,

    // NVMe metrics
    pub nvme_presence: Arc<GaugeVec>,
    pub nvme_health: Arc<GaugeVec>,
    pub nvme_smart_log: Arc<GaugeVec>,

    // Exporter self-monitoring
    pub collector_up: Arc<GaugeVec>,

    // Last poll outcome per collector, readable without touching the registry
    poll_outcomes: Arc<RwLock<HashMap<String, bool>>>,
}

impl MetricsCollector {
    pub fn new() -> crate::error::Result<Self> {
        Ok(Self::with_registry(Registry::new())?)
    }

    /// Register all families on the given registry.
    ///
    /// Fails if a family of the same name is already registered with another shape.
    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let raid_status = GaugeVec::new(
            Opts::new("raid_status", "Status of the RAID controller"),
            &["vdisk"],
        )?;

        let raid_redundancy = GaugeVec::new(
            Opts::new(
                "raid_redundancy",
                "Remaining redundancy of the RAID controller",
            ),
            &["vdisk"],
        )?;

        let raid_size = GaugeVec::new(
            Opts::new("raid_size", "Size of the RAID controller"),
            &["vdisk"],
        )?;

        let raid_layout = GaugeVec::new(
            Opts::new("raid_layout", "Layout of the RAID controller"),
            &["vdisk"],
        )?;

        let nvme_presence = GaugeVec::new(
            Opts::new(
                "nvme_presence",
                "Presence of NVMe devices (1=present, 0=absent)",
            ),
            &["device"],
        )?;

        let nvme_health = GaugeVec::new(
            Opts::new(
                "nvme_health",
                "Health of NVMe devices (1=no critical warning, 0=critical warning)",
            ),
            &["device"],
        )?;

        let nvme_smart_log = GaugeVec::new(
            Opts::new("nvme_smart_log", "SMART log metrics for NVMe devices"),
            &["device", "metric"],
        )?;

        let collector_up = GaugeVec::new(
            Opts::new(
                "collector_up",
                "Whether the last poll of the collector succeeded (1=yes, 0=no)",
            )
            .namespace("dell_disk_exporter"),
            &["collector"],
        )?;

        registry.register(Box::new(raid_status.clone()))?;
        registry.register(Box::new(raid_redundancy.clone()))?;
        registry.register(Box::new(raid_size.clone()))?;
        registry.register(Box::new(raid_layout.clone()))?;
        registry.register(Box::new(nvme_presence.clone()))?;
        registry.register(Box::new(nvme_health.clone()))?;
        registry.register(Box::new(nvme_smart_log.clone()))?;
        registry.register(Box::new(collector_up.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            raid_status: Arc::new(raid_status),
            raid_redundancy: Arc::new(raid_redundancy),
            raid_size: Arc::new(raid_size),
            raid_layout: Arc::new(raid_layout),
            nvme_presence: Arc::new(nvme_presence),
            nvme_health: Arc::new(nvme_health),
            nvme_smart_log: Arc::new(nvme_smart_log),
            collector_up: Arc::new(collector_up),
            poll_outcomes: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Create the series on first use and set its value.
    pub fn set_gauge(&self, gauge: &GaugeVec, labels: &[&str], value: f64) {
        gauge.with_label_values(labels).set(value);
    }

    /// Delete a series. Removing one that does not exist is not an error.
    pub fn remove_gauge(&self, gauge: &GaugeVec, labels: &[&str]) {
        if let Err(e) = gauge.remove_label_values(labels) {
            debug!("Series {:?} already absent: {}", labels, e);
        }
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Record the outcome of a collector's poll on `collector_up`.
    pub fn record_poll(&self, collector: &str, up: bool) {
        self.set_gauge(&self.collector_up, &[collector], if up { 1.0 } else { 0.0 });
        self.poll_outcomes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(collector.to_string(), up);
    }

    /// Last poll outcome recorded for a collector; false if it has not polled yet.
    ///
    /// Read-only: asking about a collector never creates its series.
    pub fn collector_is_up(&self, collector: &str) -> bool {
        self.poll_outcomes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(collector)
            .copied()
            .unwrap_or(false)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics collector")
    }
}
