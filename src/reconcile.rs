//! Metric State Reconciliation
//!
//! Merges each freshly parsed snapshot into the exported gauge families. This is the
//! only place with memory across polls.
//!
//! # Lifecycle of an entity (virtual disk or NVMe device)
//!
//! 1. First seen: its series are created, then set on every poll it is present.
//! 2. Missing from a poll: the first missing poll starts an absence timer. Series
//!    stay exported with their last values; NVMe presence drops to 0.
//! 3. Seen again before the grace period runs out: the timer is cleared and updates
//!    resume on the same series.
//! 4. Absent for longer than the grace period: every series of the entity is deleted
//!    and its record dropped. A later reappearance starts again at step 1.
//!
//! The grace period absorbs polls where a tool transiently fails to list a device.
//! Flapping series would break `rate()`/`deriv()` on the scrape side.
//!
//! SMART entries are tracked per key within a present device: a key missing from a
//! successful fetch loses its series immediately, without waiting for the grace
//! period that applies to the device as a whole.
//!
//! Creating a series that already exists just reuses it, so reconciling the same
//! snapshot twice leaves the exported state unchanged.

use crate::metrics::MetricsCollector;
use crate::tools::nvme::normalize_value;
use crate::tools::racadm;
use crate::tools::types::{SmartLog, VirtualDiskMap};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// SMART entry that drives `nvme_health`.
pub const CRITICAL_WARNING_KEY: &str = "critical_warning";

/// When an entity was last seen, and since when it has been missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceRecord {
    pub last_seen: Instant,
    pub absent_since: Option<Instant>,
}

/// Outcome of one [`PresenceTracker::observe`] call, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceChanges {
    /// Seen for the first time (or again after having expired)
    pub appeared: Vec<String>,
    /// Missing but still within the grace period
    pub absent: Vec<String>,
    /// Missing for longer than the grace period; the record has been dropped
    pub expired: Vec<String>,
}

/// Presence records keyed by entity identifier.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    grace: Duration,
    records: HashMap<String, PresenceRecord>,
}

impl PresenceTracker {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            records: HashMap::new(),
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn record(&self, id: &str) -> Option<&PresenceRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Apply the set of entities present at `now`.
    pub fn observe<'a, I>(&mut self, present: I, now: Instant) -> PresenceChanges
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present: HashSet<&str> = present.into_iter().collect();
        let mut changes = PresenceChanges::default();

        for id in &present {
            match self.records.get_mut(*id) {
                Some(record) => {
                    record.last_seen = now;
                    record.absent_since = None;
                }
                None => {
                    self.records.insert(
                        (*id).to_string(),
                        PresenceRecord {
                            last_seen: now,
                            absent_since: None,
                        },
                    );
                    changes.appeared.push((*id).to_string());
                }
            }
        }

        for (id, record) in self.records.iter_mut() {
            if present.contains(id.as_str()) {
                continue;
            }
            let since = *record.absent_since.get_or_insert(now);
            if now.saturating_duration_since(since) > self.grace {
                changes.expired.push(id.clone());
            } else {
                changes.absent.push(id.clone());
            }
        }

        for id in &changes.expired {
            self.records.remove(id);
        }

        changes.appeared.sort();
        changes.absent.sort();
        changes.expired.sort();
        changes
    }
}

/// Reconciles RAID virtual disks into the `raid_*` families.
pub struct RaidReconciler {
    metrics: MetricsCollector,
    tracker: PresenceTracker,
}

impl RaidReconciler {
    pub fn new(metrics: MetricsCollector, grace: Duration) -> Self {
        Self {
            metrics,
            tracker: PresenceTracker::new(grace),
        }
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    /// Merge a complete RAID snapshot taken at `now`.
    pub fn reconcile(&mut self, disks: &VirtualDiskMap, now: Instant) -> PresenceChanges {
        let changes = self.tracker.observe(disks.keys().map(String::as_str), now);
        let m = &self.metrics;

        for id in &changes.appeared {
            info!("Discovered virtual disk {}", id);
        }

        for (id, disk) in disks {
            let labels = [id.as_str()];
            m.set_gauge(&m.raid_status, &labels, racadm::status_value(disk));
            m.set_gauge(&m.raid_redundancy, &labels, racadm::redundancy_value(disk));
            m.set_gauge(&m.raid_size, &labels, racadm::size_value(disk));
            m.set_gauge(&m.raid_layout, &labels, racadm::layout_value(disk));
        }

        for id in &changes.absent {
            debug!("Virtual disk {} missing from poll, keeping last values", id);
        }

        for id in &changes.expired {
            let labels = [id.as_str()];
            m.remove_gauge(&m.raid_status, &labels);
            m.remove_gauge(&m.raid_redundancy, &labels);
            m.remove_gauge(&m.raid_size, &labels);
            m.remove_gauge(&m.raid_layout, &labels);
            info!(
                "Virtual disk {} absent for more than {}s, series retired",
                id,
                self.tracker.grace().as_secs()
            );
        }

        changes
    }
}

/// One visible NVMe device and its SMART log, if it could be fetched this poll.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub device: String,
    pub smart_log: Option<SmartLog>,
}

impl DeviceSnapshot {
    pub fn new(device: impl Into<String>, smart_log: Option<SmartLog>) -> Self {
        Self {
            device: device.into(),
            smart_log,
        }
    }
}

/// Reconciles NVMe devices into `nvme_presence`, `nvme_health` and `nvme_smart_log`.
pub struct NvmeReconciler {
    metrics: MetricsCollector,
    tracker: PresenceTracker,
    // SMART metric labels exported per device, needed to delete them on expiry
    smart_keys: HashMap<String, BTreeSet<String>>,
}

impl NvmeReconciler {
    pub fn new(metrics: MetricsCollector, grace: Duration) -> Self {
        Self {
            metrics,
            tracker: PresenceTracker::new(grace),
            smart_keys: HashMap::new(),
        }
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    /// Merge the complete set of visible devices taken at `now`.
    ///
    /// A device without a SMART log is still present; its SMART series keep the
    /// values of the last successful fetch. A successful fetch replaces the device's
    /// SMART series: entries it no longer reports, or that stopped parsing, are removed.
    pub fn reconcile(&mut self, devices: &[DeviceSnapshot], now: Instant) -> PresenceChanges {
        let changes = self
            .tracker
            .observe(devices.iter().map(|d| d.device.as_str()), now);
        let m = &self.metrics;

        for device in &changes.appeared {
            info!("Discovered NVMe device {}", device);
        }

        for snapshot in devices {
            let device = snapshot.device.as_str();
            m.set_gauge(&m.nvme_presence, &[device], 1.0);

            let Some(smart_log) = &snapshot.smart_log else {
                continue;
            };

            let mut exported = BTreeSet::new();
            for (key, value) in smart_log {
                match normalize_value(key, value) {
                    Some(v) => {
                        m.set_gauge(&m.nvme_smart_log, &[device, key.as_str()], v);
                        exported.insert(key.clone());
                    }
                    None => debug!(
                        "Skipping non-numeric SMART entry {}={:?} on {}",
                        key, value, device
                    ),
                }
            }

            let previous = self
                .smart_keys
                .insert(device.to_string(), exported.clone())
                .unwrap_or_default();
            for key in previous.difference(&exported) {
                m.remove_gauge(&m.nvme_smart_log, &[device, key.as_str()]);
                debug!("SMART entry {} no longer reported by {}", key, device);
            }

            if let Some(warning) = smart_log
                .get(CRITICAL_WARNING_KEY)
                .and_then(|value| normalize_value(CRITICAL_WARNING_KEY, value))
            {
                let health = if warning == 0.0 { 1.0 } else { 0.0 };
                m.set_gauge(&m.nvme_health, &[device], health);
            }
        }

        for device in &changes.absent {
            m.set_gauge(&m.nvme_presence, &[device.as_str()], 0.0);
            debug!("NVMe device {} missing from poll, marked absent", device);
        }

        for device in &changes.expired {
            let labels = [device.as_str()];
            m.remove_gauge(&m.nvme_presence, &labels);
            m.remove_gauge(&m.nvme_health, &labels);
            for key in self.smart_keys.remove(device).unwrap_or_default() {
                m.remove_gauge(&m.nvme_smart_log, &[device.as_str(), key.as_str()]);
            }
            info!(
                "NVMe device {} absent for more than {}s, series retired",
                device,
                self.tracker.grace().as_secs()
            );
        }

        changes
    }
}
