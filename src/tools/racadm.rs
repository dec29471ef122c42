//! RAID Virtual Disk Status (`racadm`)
//!
//! Queries the Dell RAID controller for its virtual disks and parses the outline
//! formatted reply:
//!
//! ```text
//! Disk.Virtual.1:RAID.Integrated.1-1
//!    Layout                           = Raid-10
//!    Status                           = Ok
//!    RemainingRedundancy              = 1
//!    Size                             = 1787.50 GB
//! ```
//!
//! Parsing never fails. Lines that fit neither a record marker nor an attribute are
//! skipped, as is anything before the first marker.

use crate::error::Result;
use crate::tools::executor::CommandExecutor;
use crate::tools::types::{
    VirtualDisk, VirtualDiskMap, ATTR_LAYOUT, ATTR_REMAINING_REDUNDANCY, ATTR_SIZE, ATTR_STATUS,
};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Arguments requesting layout, status, redundancy and size for every virtual disk.
pub const RACADM_VDISK_ARGS: &[&str] = &[
    "raid",
    "get",
    "vdisks",
    "-o",
    "-p",
    "layout,status,RemainingRedundancy,Size",
];

const VDISK_MARKER: &str = "Disk.Virtual";

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid size regex"));

/// Client for the RAID management tool
pub struct RaidClient {
    executor: Arc<dyn CommandExecutor>,
    program: String,
}

impl RaidClient {
    pub fn new(executor: Arc<dyn CommandExecutor>, program: impl Into<String>) -> Self {
        Self {
            executor,
            program: program.into(),
        }
    }

    /// Query all virtual disks. An empty map means the controller reported none.
    pub async fn query_virtual_disks(&self) -> Result<VirtualDiskMap> {
        let output = self.executor.execute(&self.program, RACADM_VDISK_ARGS).await?;
        let disks = parse_vdisks(&String::from_utf8_lossy(&output));
        debug!("Parsed {} virtual disk(s) from {}", disks.len(), self.program);
        Ok(disks)
    }
}

/// Parse `racadm raid get vdisks -o` output into virtual disks keyed by identifier.
pub fn parse_vdisks(output: &str) -> VirtualDiskMap {
    let mut disks = VirtualDiskMap::new();
    let mut current: Option<String> = None;

    for line in output.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with(VDISK_MARKER) {
            current = trimmed
                .split_once(':')
                .map(|(_, id)| id.trim())
                .filter(|id| !id.is_empty())
                .map(str::to_string);

            if let Some(id) = &current {
                disks
                    .entry(id.clone())
                    .or_insert_with(|| VirtualDisk::new(id.clone()));
            }
            continue;
        }

        let Some(id) = &current else { continue };
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        if let Some(disk) = disks.get_mut(id) {
            disk.attributes
                .insert(key.to_string(), value.trim().to_string());
        }
    }

    disks
}

/// 1 when the controller reports the disk as exactly `Ok`, else 0.
pub fn status_value(disk: &VirtualDisk) -> f64 {
    match disk.attribute(ATTR_STATUS) {
        Some("Ok") => 1.0,
        _ => 0.0,
    }
}

/// Remaining redundancy from the first token of the attribute, 0 if unparseable.
pub fn redundancy_value(disk: &VirtualDisk) -> f64 {
    disk.attribute(ATTR_REMAINING_REDUNDANCY)
        .and_then(|v| v.split_whitespace().next())
        .and_then(|token| token.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Size with the unit text dropped (`"1787.50 GB"` is 1787.5), 0 if unparseable.
pub fn size_value(disk: &VirtualDisk) -> f64 {
    disk.attribute(ATTR_SIZE).map(parse_size).unwrap_or(0.0)
}

/// 1 when any layout was reported. The RAID level itself is not encoded.
pub fn layout_value(disk: &VirtualDisk) -> f64 {
    match disk.attribute(ATTR_LAYOUT) {
        Some(layout) if !layout.is_empty() => 1.0,
        _ => 0.0,
    }
}

pub fn parse_size(size: &str) -> f64 {
    LEADING_NUMBER
        .find(size)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}
