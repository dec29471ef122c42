use crate::error::ExporterError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_absence_grace")]
    pub absence_grace_seconds: u64,
    #[serde(default = "default_true")]
    pub collect_raid_metrics: bool,
    #[serde(default = "default_true")]
    pub collect_nvme_metrics: bool,
}

/// External diagnostic tools and the timeout applied to each invocation.
#[derive(Debug, Deserialize, Clone)]
pub struct CommandsConfig {
    #[serde(default = "default_command_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_racadm")]
    pub racadm: String,
    #[serde(default = "default_lsblk")]
    pub lsblk: String,
    #[serde(default = "default_nvme")]
    pub nvme: String,
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_poll_interval() -> u64 {
    30
}

fn default_absence_grace() -> u64 {
    300
}

fn default_command_timeout() -> u64 {
    60
}

fn default_racadm() -> String {
    "racadm".to_string()
}

fn default_lsblk() -> String {
    "lsblk".to_string()
}

fn default_nvme() -> String {
    "nvme".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            absence_grace_seconds: default_absence_grace(),
            collect_raid_metrics: true,
            collect_nvme_metrics: true,
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_command_timeout(),
            racadm: default_racadm(),
            lsblk: default_lsblk(),
            nvme: default_nvme(),
        }
    }
}

impl MetricsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn absence_grace(&self) -> Duration {
        Duration::from_secs(self.absence_grace_seconds)
    }
}

impl CommandsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Read file and environment layers. Call [`Config::validate`] once any
    /// command-line overrides have been applied.
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("DELL_DISK_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Reject settings the polling loops cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.metrics.poll_interval_seconds == 0 {
            return Err(ExporterError::Config(
                "poll_interval_seconds must be greater than zero".to_string(),
            ));
        }
        if self.commands.timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "commands.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.metrics.absence_grace_seconds < self.metrics.poll_interval_seconds {
            return Err(ExporterError::Config(format!(
                "absence_grace_seconds ({}) must be at least one poll interval ({})",
                self.metrics.absence_grace_seconds, self.metrics.poll_interval_seconds
            )));
        }
        Ok(())
    }
}
