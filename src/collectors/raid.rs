//! RAID Virtual Disk Collector
//!
//! Polls `racadm` for virtual disk status.
//!
//! # Metrics Produced
//! - `raid_status` - 1 when Status is `Ok`, else 0
//! - `raid_redundancy` - RemainingRedundancy, 0 if unparseable
//! - `raid_size` - Size without its unit, 0 if unparseable
//! - `raid_layout` - 1 when a Layout was reported
//!
//! All labelled by `vdisk`.

use super::{collect_with_handler, CollectionStatus, Collector};
use crate::metrics::MetricsCollector;
use crate::reconcile::RaidReconciler;
use crate::tools::RaidClient;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct RaidCollector {
    client: RaidClient,
    reconciler: RaidReconciler,
}

impl RaidCollector {
    pub fn new(client: RaidClient, metrics: MetricsCollector, grace: Duration) -> Self {
        Self {
            client,
            reconciler: RaidReconciler::new(metrics, grace),
        }
    }

    pub fn reconciler(&self) -> &RaidReconciler {
        &self.reconciler
    }
}

#[async_trait]
impl Collector for RaidCollector {
    fn name(&self) -> &'static str {
        "raid"
    }

    async fn collect(&mut self, now: Instant) -> CollectionStatus {
        let reconciler = &mut self.reconciler;
        collect_with_handler(
            "RAID virtual disk",
            self.client.query_virtual_disks(),
            |disks| {
                let changes = reconciler.reconcile(&disks, now);
                debug!(
                    "RAID poll: {} present, {} absent, {} retired",
                    disks.len(),
                    changes.absent.len(),
                    changes.expired.len()
                );
            },
        )
        .await
    }
}
