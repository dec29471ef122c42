//! Parsed Tool Output
//!
//! Snapshot types produced by the parsers. They are rebuilt on every poll and carry
//! no identity beyond their keys; cross-poll memory lives in the reconcilers.

use std::collections::BTreeMap;

/// Attribute keys requested from `racadm` for each virtual disk.
pub const ATTR_LAYOUT: &str = "Layout";
pub const ATTR_STATUS: &str = "Status";
pub const ATTR_REMAINING_REDUNDANCY: &str = "RemainingRedundancy";
pub const ATTR_SIZE: &str = "Size";

/// A RAID virtual disk as reported by `racadm raid get vdisks`.
///
/// Attribute values are kept as the raw strings the tool printed. Typed values are
/// derived on demand; see [`crate::tools::racadm`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualDisk {
    /// Identifier after the record marker, e.g. `RAID.Integrated.1-1`
    pub id: String,
    pub attributes: BTreeMap<String, String>,
}

impl VirtualDisk {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// All virtual disks from one RAID poll, keyed by identifier.
pub type VirtualDiskMap = BTreeMap<String, VirtualDisk>;

/// A single SMART log entry.
///
/// JSON output yields numbers directly. Free-text output (and some JSON fields) yields
/// strings that still need normalisation before they can be exported.
#[derive(Debug, Clone, PartialEq)]
pub enum SmartValue {
    Number(f64),
    Text(String),
}

/// One device's SMART log for one poll, keyed by metric name.
pub type SmartLog = BTreeMap<String, SmartValue>;
