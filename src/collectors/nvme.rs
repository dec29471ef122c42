//! NVMe SMART Collector
//!
//! Discovers visible NVMe disks, then fetches each one's SMART log in turn.
//!
//! # Metrics Produced
//! - `nvme_presence` - 1 while visible, 0 while absent within the grace period
//!   - Labels: device
//! - `nvme_health` - 1 when critical_warning is 0
//!   - Labels: device
//! - `nvme_smart_log` - every numeric SMART entry
//!   - Labels: device, metric
//!
//! Devices are fetched one at a time so at most one `nvme` process runs per poll.
//! A device whose SMART fetch fails is still counted as present.

use super::{CollectionStatus, Collector};
use crate::metrics::MetricsCollector;
use crate::reconcile::{DeviceSnapshot, NvmeReconciler};
use crate::tools::{DriveDiscovery, SmartClient};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct NvmeCollector {
    discovery: Arc<dyn DriveDiscovery>,
    client: SmartClient,
    reconciler: NvmeReconciler,
}

impl NvmeCollector {
    pub fn new(
        discovery: Arc<dyn DriveDiscovery>,
        client: SmartClient,
        metrics: MetricsCollector,
        grace: Duration,
    ) -> Self {
        Self {
            discovery,
            client,
            reconciler: NvmeReconciler::new(metrics, grace),
        }
    }

    pub fn reconciler(&self) -> &NvmeReconciler {
        &self.reconciler
    }
}

#[async_trait]
impl Collector for NvmeCollector {
    fn name(&self) -> &'static str {
        "nvme"
    }

    async fn collect(&mut self, now: Instant) -> CollectionStatus {
        let devices = match self.discovery.discover().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Failed to discover NVMe devices: {}", e);
                return CollectionStatus::Failed;
            }
        };

        let mut snapshots = Vec::with_capacity(devices.len());
        for device in devices {
            let smart_log = match self.client.query_smart_log(&device).await {
                Ok(log) => Some(log),
                Err(e) => {
                    warn!("Failed to get SMART log for {}: {}", device, e);
                    None
                }
            };
            snapshots.push(DeviceSnapshot::new(device, smart_log));
        }

        let changes = self.reconciler.reconcile(&snapshots, now);
        info!(
            "Updated NVMe metrics ({} present, {} absent, {} retired)",
            snapshots.len(),
            changes.absent.len(),
            changes.expired.len()
        );
        CollectionStatus::Success
    }
}
