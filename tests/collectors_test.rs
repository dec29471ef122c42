//! Collector tests
//!
//! Run full poll cycles against scripted tools and check what the registry exposes,
//! including how failures leave the previous state alone.

mod common;

use common::{
    count_series, sample_value, MockExecutor, StaticDiscovery, LSBLK_OUTPUT, RACADM_TWO_VDISKS,
    SMART_LOG_JSON, SMART_LOG_JSON_ENTRIES,
};
use dell_disk_exporter::collectors::{CollectionStatus, Collector, NvmeCollector, RaidCollector};
use dell_disk_exporter::metrics::MetricsCollector;
use dell_disk_exporter::server::poll_once;
use dell_disk_exporter::tools::{LsblkDiscovery, RaidClient, SmartClient};
use std::sync::Arc;
use std::time::{Duration, Instant};

const INTERVAL: Duration = Duration::from_secs(30);
const GRACE: Duration = Duration::from_secs(300);

fn create_test_metrics() -> MetricsCollector {
    MetricsCollector::new().expect("Failed to create metrics")
}

#[tokio::test]
async fn test_raid_collector_exports_virtual_disks() {
    // Given: racadm reporting two healthy virtual disks
    let metrics = create_test_metrics();
    let executor = MockExecutor::new();
    executor.respond("racadm", RACADM_TWO_VDISKS);
    let mut collector = RaidCollector::new(
        RaidClient::new(executor, "racadm"),
        metrics.clone(),
        GRACE,
    );

    // When: Running one poll
    let status = collector.collect(Instant::now()).await;

    // Then: All four families carry both disks
    assert_eq!(status, CollectionStatus::Success);
    let rendered = metrics.render().unwrap();
    for family in ["raid_status", "raid_redundancy", "raid_size", "raid_layout"] {
        assert_eq!(count_series(&rendered, family, ""), 2, "{}", family);
    }
    assert_eq!(
        sample_value(&rendered, "raid_size", &[("vdisk", "RAID.Integrated.1-1")]),
        Some(1787.5)
    );
    assert_eq!(collector.reconciler().tracker().len(), 2);
}

#[tokio::test]
async fn test_raid_failure_keeps_previous_state() {
    let metrics = create_test_metrics();
    let executor = MockExecutor::new();
    executor.respond("racadm", RACADM_TWO_VDISKS);
    let mut collector = RaidCollector::new(
        RaidClient::new(executor.clone(), "racadm"),
        metrics.clone(),
        GRACE,
    );
    let t0 = Instant::now();

    collector.collect(t0).await;
    let before = metrics.render().unwrap();

    // racadm fails for far longer than the grace period
    executor.fail("racadm", "timed out");
    let mut now = t0;
    for _ in 0..20 {
        now += INTERVAL;
        assert_eq!(collector.collect(now).await, CollectionStatus::Failed);
    }

    // Failed polls never count as absence, so nothing was retired
    assert_eq!(metrics.render().unwrap(), before);
}

#[tokio::test]
async fn test_poll_once_records_collector_up() {
    let metrics = create_test_metrics();
    let executor = MockExecutor::new();
    executor.respond("racadm", RACADM_TWO_VDISKS);
    let mut collector = RaidCollector::new(
        RaidClient::new(executor.clone(), "racadm"),
        metrics.clone(),
        GRACE,
    );

    poll_once(&mut collector, &metrics).await;
    let rendered = metrics.render().unwrap();
    assert_eq!(
        sample_value(
            &rendered,
            "dell_disk_exporter_collector_up",
            &[("collector", "raid")]
        ),
        Some(1.0)
    );
    assert!(metrics.collector_is_up("raid"));

    executor.fail("racadm", "not found");
    poll_once(&mut collector, &metrics).await;
    assert!(!metrics.collector_is_up("raid"));
    // Entity series survive the failed poll
    let rendered = metrics.render().unwrap();
    assert_eq!(count_series(&rendered, "raid_status", ""), 2);
}

#[tokio::test]
async fn test_nvme_collector_end_to_end_with_lsblk() {
    // Given: lsblk listing two NVMe disks and nvme returning JSON for both
    let metrics = create_test_metrics();
    let executor = MockExecutor::new();
    executor.respond("lsblk", LSBLK_OUTPUT);
    executor.respond("nvme", SMART_LOG_JSON);
    let discovery = Arc::new(LsblkDiscovery::new(executor.clone(), "lsblk"));
    let mut collector = NvmeCollector::new(
        discovery,
        SmartClient::new(executor.clone(), "nvme"),
        metrics.clone(),
        GRACE,
    );

    // When: Running one poll
    let status = collector.collect(Instant::now()).await;

    // Then: Each device has its presence and full SMART log
    assert_eq!(status, CollectionStatus::Success);
    let rendered = metrics.render().unwrap();
    for device in ["nvme0n1", "nvme1n1"] {
        assert_eq!(
            count_series(&rendered, "nvme_smart_log", &format!("device=\"{}\"", device)),
            SMART_LOG_JSON_ENTRIES
        );
        assert_eq!(
            sample_value(&rendered, "nvme_presence", &[("device", device)]),
            Some(1.0)
        );
    }

    // Devices are fetched one after another, after discovery
    assert_eq!(
        executor.calls(),
        vec![
            "lsblk -d -n -o NAME,TYPE".to_string(),
            "nvme smart-log /dev/nvme0n1 --output-format json".to_string(),
            "nvme smart-log /dev/nvme1n1 --output-format json".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_one_device_failure_does_not_abort_cycle() {
    let metrics = create_test_metrics();
    let executor = MockExecutor::new();
    executor.respond("nvme", SMART_LOG_JSON);
    executor.fail("nvme smart-log /dev/nvme0n1", "device busy");
    let discovery = StaticDiscovery::new(&["nvme0n1", "nvme1n1"]);
    let mut collector = NvmeCollector::new(
        discovery,
        SmartClient::new(executor, "nvme"),
        metrics.clone(),
        GRACE,
    );

    let status = collector.collect(Instant::now()).await;

    assert_eq!(status, CollectionStatus::Success);
    let rendered = metrics.render().unwrap();
    // The failing device is still visible, just without SMART values
    assert_eq!(
        sample_value(&rendered, "nvme_presence", &[("device", "nvme0n1")]),
        Some(1.0)
    );
    assert_eq!(
        count_series(&rendered, "nvme_smart_log", "device=\"nvme0n1\""),
        0
    );
    assert_eq!(
        count_series(&rendered, "nvme_smart_log", "device=\"nvme1n1\""),
        SMART_LOG_JSON_ENTRIES
    );
}

#[tokio::test]
async fn test_discovery_failure_keeps_previous_state() {
    let metrics = create_test_metrics();
    let executor = MockExecutor::new();
    executor.respond("nvme", SMART_LOG_JSON);
    let discovery = StaticDiscovery::new(&["nvme0n1"]);
    let mut collector = NvmeCollector::new(
        discovery.clone(),
        SmartClient::new(executor, "nvme"),
        metrics.clone(),
        GRACE,
    );
    let t0 = Instant::now();

    collector.collect(t0).await;
    let before = metrics.render().unwrap();

    discovery.fail();
    let status = collector.collect(t0 + GRACE * 2).await;

    // Stale but present beats flapping to absent on a transient error
    assert_eq!(status, CollectionStatus::Failed);
    assert_eq!(metrics.render().unwrap(), before);
}

#[tokio::test]
async fn test_drive_removal_goes_through_grace_period() {
    let metrics = create_test_metrics();
    let executor = MockExecutor::new();
    executor.respond("nvme", SMART_LOG_JSON);
    let discovery = StaticDiscovery::new(&["nvme0n1"]);
    let mut collector = NvmeCollector::new(
        discovery.clone(),
        SmartClient::new(executor, "nvme"),
        metrics.clone(),
        GRACE,
    );
    let t0 = Instant::now();
    let labels = [("device", "nvme0n1")];

    collector.collect(t0).await;

    // An empty listing is a valid answer: the drive is absent
    discovery.set(&[]);
    assert_eq!(
        collector.collect(t0 + INTERVAL).await,
        CollectionStatus::Success
    );
    let rendered = metrics.render().unwrap();
    assert_eq!(sample_value(&rendered, "nvme_presence", &labels), Some(0.0));
    assert_eq!(
        count_series(&rendered, "nvme_smart_log", "device=\"nvme0n1\""),
        SMART_LOG_JSON_ENTRIES
    );

    collector.collect(t0 + INTERVAL + GRACE + INTERVAL).await;
    let rendered = metrics.render().unwrap();
    assert_eq!(sample_value(&rendered, "nvme_presence", &labels), None);
    assert_eq!(count_series(&rendered, "nvme_smart_log", ""), 0);
}

#[tokio::test]
async fn test_subsystems_share_registry_but_not_state() {
    let metrics = create_test_metrics();
    let executor = MockExecutor::new();
    executor.respond("racadm", RACADM_TWO_VDISKS);
    executor.respond("nvme", SMART_LOG_JSON);
    let mut raid = RaidCollector::new(
        RaidClient::new(executor.clone(), "racadm"),
        metrics.clone(),
        GRACE,
    );
    let mut nvme = NvmeCollector::new(
        StaticDiscovery::new(&["nvme0n1"]),
        SmartClient::new(executor.clone(), "nvme"),
        metrics.clone(),
        GRACE,
    );

    let t0 = Instant::now();
    raid.collect(t0).await;
    nvme.collect(t0).await;

    executor.fail("racadm", "controller reset");
    raid.collect(t0 + INTERVAL).await;
    nvme.collect(t0 + INTERVAL).await;

    let rendered = metrics.render().unwrap();
    assert_eq!(count_series(&rendered, "raid_status", ""), 2);
    assert_eq!(
        sample_value(&rendered, "nvme_presence", &[("device", "nvme0n1")]),
        Some(1.0)
    );
    assert_eq!(raid.name(), "raid");
    assert_eq!(nvme.name(), "nvme");
}
