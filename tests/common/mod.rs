//! Test doubles and helpers shared by the integration tests
//!
//! Provides a scripted command executor and a controllable drive discovery so
//! collectors can run without Dell hardware, plus helpers to read values back out of
//! the rendered Prometheus exposition.

#![allow(dead_code)]

use async_trait::async_trait;
use dell_disk_exporter::error::{ExporterError, Result};
use dell_disk_exporter::tools::{CommandExecutor, DriveDiscovery};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const RACADM_TWO_VDISKS: &str = "
Disk.Virtual.1:RAID.Integrated.1-1
   Layout                           = Raid-10
   Status                           = Ok
   RemainingRedundancy              = 1
   Size                             = 1787.50 GB
Disk.Virtual.0:RAID.Integrated.1-0
   Layout                           = Raid-1
   Status                           = Ok
   RemainingRedundancy              = 1
   Size                             = 372.00 GB
";

pub const SMART_LOG_JSON: &str = r#"{
  "critical_warning" : 0,
  "temperature" : 301,
  "avail_spare" : 100,
  "spare_thresh" : 5,
  "percent_used" : 15,
  "data_units_read" : 499296134,
  "data_units_written" : 1474968593,
  "host_read_commands" : 9347931143,
  "host_write_commands" : 51493840602,
  "controller_busy_time" : 1974546,
  "power_cycles" : 290,
  "power_on_hours" : 38313,
  "unsafe_shutdowns" : 139,
  "media_errors" : 0,
  "num_err_log_entries" : 17,
  "warning_temp_time" : 0,
  "critical_comp_time" : 0,
  "temperature_sensor_1" : 306,
  "temperature_sensor_2" : 301,
  "temperature_sensor_3" : 296,
  "temperature_sensor_4" : 295,
  "thm_temp1_trans_count" : 0,
  "thm_temp2_trans_count" : 0,
  "thm_temp1_total_time" : 0,
  "thm_temp2_total_time" : 0
}"#;

/// Number of entries in [`SMART_LOG_JSON`]: critical_warning plus 24 counters.
pub const SMART_LOG_JSON_ENTRIES: usize = 25;

pub const SMART_LOG_TEXT: &str = "Smart Log for NVME device:nvme0n1 namespace-id:ffffffff
critical_warning                        : 0
temperature                             : 36 C (309 Kelvin)
available_spare                         : 100%
available_spare_threshold               : 10%
percentage_used                         : 3%
data_units_read                         : 499,296,134 (255.64 TB)
power_on_hours                          : 38,313
Warning Temperature Time                : 0
unsafe_shutdowns                        : 139
";

pub const LSBLK_OUTPUT: &str = "sda     disk
sda1    part
nvme0n1 disk
nvme1n1 disk
sr0     rom
";

#[derive(Debug, Clone)]
enum MockResponse {
    Output(String),
    Fail(String),
}

/// Executor answering from a script keyed by command-line prefix.
///
/// The longest matching prefix wins, so `"nvme"` can be a default while
/// `"nvme smart-log /dev/nvme1n1"` overrides one device.
#[derive(Default)]
pub struct MockExecutor {
    responses: Mutex<HashMap<String, MockResponse>>,
    calls: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, prefix: &str, output: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(prefix.to_string(), MockResponse::Output(output.to_string()));
    }

    pub fn fail(&self, prefix: &str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(prefix.to_string(), MockResponse::Fail(message.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<Vec<u8>> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().unwrap().push(line.clone());

        let response = {
            let responses = self.responses.lock().unwrap();
            responses
                .iter()
                .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, response)| response.clone())
        };

        match response {
            Some(MockResponse::Output(output)) => Ok(output.into_bytes()),
            Some(MockResponse::Fail(message)) => Err(ExporterError::Spawn {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, message),
            }),
            None => Err(ExporterError::Spawn {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not scripted"),
            }),
        }
    }
}

/// Discovery returning whatever drive list the test sets, or failing.
pub struct StaticDiscovery {
    drives: Mutex<Option<Vec<String>>>,
}

impl StaticDiscovery {
    pub fn new(drives: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            drives: Mutex::new(Some(drives.iter().map(|d| d.to_string()).collect())),
        })
    }

    pub fn set(&self, drives: &[&str]) {
        *self.drives.lock().unwrap() = Some(drives.iter().map(|d| d.to_string()).collect());
    }

    pub fn fail(&self) {
        *self.drives.lock().unwrap() = None;
    }
}

#[async_trait]
impl DriveDiscovery for StaticDiscovery {
    async fn discover(&self) -> Result<Vec<String>> {
        self.drives
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ExporterError::Spawn {
                program: "lsblk".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "enumeration failed"),
            })
    }
}

fn series_prefix(family: &str, labels: &[(&str, &str)]) -> String {
    let labels: Vec<String> = labels
        .iter()
        .map(|(name, value)| format!("{}=\"{}\"", name, value))
        .collect();
    format!("{}{{{}}} ", family, labels.join(","))
}

/// Value of one series in rendered exposition text, labels given in name order.
pub fn sample_value(rendered: &str, family: &str, labels: &[(&str, &str)]) -> Option<f64> {
    let prefix = series_prefix(family, labels);
    rendered
        .lines()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
        .and_then(|value| value.trim().parse().ok())
}

/// Number of series of `family` whose label block starts with `label_prefix`.
pub fn count_series(rendered: &str, family: &str, label_prefix: &str) -> usize {
    let prefix = format!("{}{{{}", family, label_prefix);
    rendered
        .lines()
        .filter(|line| line.starts_with(prefix.as_str()))
        .count()
}
