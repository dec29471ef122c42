//! NVMe Discovery (`lsblk`)
//!
//! Lists whole block devices and keeps the NVMe disks. Discovery is a capability
//! handed to the NVMe collector so tests can fake which drives are visible.

use crate::error::Result;
use crate::tools::executor::CommandExecutor;
use async_trait::async_trait;
use std::sync::Arc;

/// Device listing without header, whole disks only, name and type columns.
pub const LSBLK_ARGS: &[&str] = &["-d", "-n", "-o", "NAME,TYPE"];

/// Lists the NVMe devices currently visible to the OS.
///
/// An empty list is a valid answer (no NVMe hardware), not a failure.
#[async_trait]
pub trait DriveDiscovery: Send + Sync {
    async fn discover(&self) -> Result<Vec<String>>;
}

/// Discovery backed by `lsblk`
pub struct LsblkDiscovery {
    executor: Arc<dyn CommandExecutor>,
    program: String,
}

impl LsblkDiscovery {
    pub fn new(executor: Arc<dyn CommandExecutor>, program: impl Into<String>) -> Self {
        Self {
            executor,
            program: program.into(),
        }
    }
}

#[async_trait]
impl DriveDiscovery for LsblkDiscovery {
    async fn discover(&self) -> Result<Vec<String>> {
        let output = self.executor.execute(&self.program, LSBLK_ARGS).await?;
        Ok(parse_nvme_devices(&String::from_utf8_lossy(&output)))
    }
}

/// Extract NVMe disk names, in listing order, from `lsblk -d -n -o NAME,TYPE` output.
pub fn parse_nvme_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(name), Some("disk")) if name.starts_with("nvme") => Some(name.to_string()),
                _ => None,
            }
        })
        .collect()
}
