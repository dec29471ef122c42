//! Metrics Collectors
//!
//! One collector per hardware subsystem. A collector runs a single poll cycle:
//! fetch from the diagnostic tool, parse, then hand the snapshot to its reconciler.
//!
//! # Architecture
//!
//! Collectors are stateful (each owns a reconciler) and are driven by their own
//! polling loop in [`crate::server`]. The RAID and NVMe collectors share nothing
//! mutable with each other.
//!
//! # Error Handling
//!
//! A failed fetch is logged as a warning and returns [`CollectionStatus::Failed`]
//! without touching the reconciler, so the previous cycle's series stay exported.
//! Nothing in a poll cycle is fatal.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

/// Status of a metrics collection operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Metrics were successfully collected and updated
    Success,
    /// Collection failed but is non-fatal (already logged as warning)
    Failed,
}

/// A subsystem that can be polled once per interval.
#[async_trait]
pub trait Collector: Send {
    /// Short label used in logs and on `dell_disk_exporter_collector_up`
    fn name(&self) -> &'static str;

    /// Run one fetch-parse-reconcile cycle for a poll taken at `now`.
    async fn collect(&mut self, now: Instant) -> CollectionStatus;
}

/// Helper to reduce boilerplate in collectors
///
/// Wraps tool queries with consistent error handling:
/// - On success: processes data, logs success, returns `CollectionStatus::Success`
/// - On error: logs warning, returns `CollectionStatus::Failed` (non-fatal)
///
/// # Arguments
///
/// * `name` - Name of the metric type being collected (for logging)
/// * `query_future` - Async tool call that returns parsed data
/// * `process` - Function to reconcile the data into metrics
pub async fn collect_with_handler<T, F, P, E>(
    name: &str,
    query_future: F,
    process: P,
) -> CollectionStatus
where
    F: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: FnOnce(T),
{
    match query_future.await {
        Ok(data) => {
            process(data);
            info!("Updated {} metrics", name);
            CollectionStatus::Success
        }
        Err(e) => {
            warn!("Failed to query {}: {}", name, e);
            CollectionStatus::Failed
        }
    }
}

// Collector modules
pub mod nvme;
pub mod raid;

pub use nvme::NvmeCollector;
pub use raid::RaidCollector;
