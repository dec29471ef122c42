//! Dell Disk Prometheus Exporter
//!
//! A Prometheus metrics exporter for Dell PowerEdge storage health: RAID virtual disks
//! (via `racadm`) and NVMe SMART logs (via `lsblk` and `nvme-cli`).
//!
//! # Overview
//!
//! The exporter periodically runs the diagnostic tools, parses their text or JSON
//! output, and reconciles the result into a set of labelled gauges. Series appear
//! when a disk is first seen and are retired only after it has been missing for a
//! configurable grace period, so one flaky tool run does not break dashboards.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   stdout+stderr   ┌──────────────────────────────┐
//! │ racadm       │ ────────────────► │  Exporter                    │
//! │ lsblk / nvme │                   │  ┌────────┐   ┌───────────┐  │     HTTP      ┌────────────┐
//! └──────────────┘                   │  │Parsers │ ─►│Reconciler │  │ ◄───────────► │ Prometheus │
//!                                    │  └────────┘   └───────────┘  │   /metrics    └────────────┘
//!                                    └──────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`tools`] - command executor, tool clients and output parsers
//! - [`reconcile`] - presence tracking and gauge reconciliation
//! - [`collectors`] - one poll cycle per subsystem
//! - [`metrics`] - Prometheus metric definitions
//! - [`server`] - HTTP server and polling loops
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use dell_disk_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod reconcile;
pub mod server;
pub mod tools;
