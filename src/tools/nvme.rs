//! NVMe SMART Log (`nvme smart-log`)
//!
//! Fetches the SMART/health log of one NVMe device and turns it into a [`SmartLog`].
//!
//! # Parsing
//!
//! JSON output is preferred. Older `nvme-cli` builds ignore `--output-format json`
//! and print `key : value` lines instead, so anything that does not decode as a JSON
//! object falls back to line parsing. The fallback never fails; keys it cannot find
//! are simply absent.
//!
//! # Normalisation
//!
//! Numeric JSON values are exported unchanged. String values are coerced when the
//! metrics are reconciled:
//! - temperature keys: `"36 C (309 Kelvin)"` gives 36, a bare number that looks like
//!   Kelvin is converted to Celsius
//! - everything else: the first token parsed as a float, or the entry is skipped

use crate::error::Result;
use crate::tools::executor::CommandExecutor;
use crate::tools::types::{SmartLog, SmartValue};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, LazyLock};

/// Bare temperatures at or above this are taken to be Kelvin.
pub const KELVIN_THRESHOLD: f64 = 200.0;

const KELVIN_OFFSET: f64 = 273.15;

static CELSIUS_WITH_KELVIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+)\s*°?\s*C\s*\(\s*\d+\s*Kelvin\s*\)").expect("valid temperature regex")
});

/// Client for the NVMe diagnostic tool
pub struct SmartClient {
    executor: Arc<dyn CommandExecutor>,
    program: String,
}

impl SmartClient {
    pub fn new(executor: Arc<dyn CommandExecutor>, program: impl Into<String>) -> Self {
        Self {
            executor,
            program: program.into(),
        }
    }

    /// Fetch the SMART log for a device name such as `nvme0n1`.
    pub async fn query_smart_log(&self, device: &str) -> Result<SmartLog> {
        let path = format!("/dev/{}", device);
        let output = self
            .executor
            .execute(
                &self.program,
                &["smart-log", &path, "--output-format", "json"],
            )
            .await?;
        Ok(parse_smart_log(&String::from_utf8_lossy(&output)))
    }
}

/// Parse `nvme smart-log` output, JSON first and `key : value` text otherwise.
pub fn parse_smart_log(output: &str) -> SmartLog {
    // Stderr is appended after stdout, so only the leading JSON document matters.
    let deserializer = serde_json::Deserializer::from_str(output);
    let mut documents = deserializer.into_iter::<Map<String, Value>>();
    match documents.next() {
        Some(Ok(object)) => from_json_object(object),
        _ => parse_smart_log_text(output),
    }
}

fn from_json_object(object: Map<String, Value>) -> SmartLog {
    object
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Number(n) => n.as_f64().map(|n| (key, SmartValue::Number(n))),
            Value::String(s) => Some((key, SmartValue::Text(s))),
            _ => None,
        })
        .collect()
}

/// Line-oriented fallback: every line with a `:` is split on the first one.
pub fn parse_smart_log_text(output: &str) -> SmartLog {
    output
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = normalize_key(key);
            if key.is_empty() {
                return None;
            }
            Some((key, SmartValue::Text(value.trim().to_string())))
        })
        .collect()
}

/// Bring a free-text key to the JSON spelling: `"Data Units Read"` to `data_units_read`.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .replace('%', "percent")
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Temperature readings, excluding counters and durations of temperature events.
pub fn is_temperature_key(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("temp") && !key.contains("time") && !key.contains("count")
}

/// Numeric value to export for a SMART entry, or `None` to skip it.
pub fn normalize_value(key: &str, value: &SmartValue) -> Option<f64> {
    match value {
        SmartValue::Number(n) => Some(*n),
        SmartValue::Text(text) if is_temperature_key(key) => convert_temperature(text),
        SmartValue::Text(text) => parse_leading_number(text),
    }
}

/// Celsius from `"<C> C (<K> Kelvin)"`, or from a bare number (Kelvin if implausibly hot).
pub fn convert_temperature(value: &str) -> Option<f64> {
    if let Some(celsius) = CELSIUS_WITH_KELVIN
        .captures(value)
        .and_then(|caps| caps[1].parse::<f64>().ok())
    {
        return Some(celsius);
    }

    let reading = parse_leading_number(value)?;
    if reading >= KELVIN_THRESHOLD {
        Some(reading - KELVIN_OFFSET)
    } else {
        Some(reading)
    }
}

fn parse_leading_number(value: &str) -> Option<f64> {
    let token = value.split_whitespace().next()?;
    let token = token.trim_end_matches('%').replace(',', "");
    token.parse::<f64>().ok()
}
