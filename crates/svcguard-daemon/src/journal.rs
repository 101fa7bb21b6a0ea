//! Recent journal entries for services with `fetch_event_logs` enabled

use crate::sink::ServiceEventLog;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::process::Command;
use svcguard_core::{Error, HostIdentity, Result};
use tracing::debug;

/// Reads unit logs through `journalctl`
#[derive(Debug, Clone)]
pub struct JournalReader {
    minutes: u32,
    journalctl: String,
}

impl JournalReader {
    pub fn new(minutes: u32) -> Self {
        Self {
            minutes,
            journalctl: "journalctl".to_string(),
        }
    }

    /// Entries for `service` from the last `minutes` minutes
    pub fn fetch(&self, service: &str, identity: &HostIdentity) -> Result<Vec<ServiceEventLog>> {
        let output = Command::new(&self.journalctl)
            .arg("--unit")
            .arg(service)
            .arg("--since")
            .arg(format!("-{}min", self.minutes))
            .arg("--output=json")
            .arg("--no-pager")
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Query(format!(
                "journalctl for {} failed: {}",
                service,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let events = parse_entries(&stdout, service, identity);
        debug!("Collected {} journal entries for {}", events.len(), service);
        Ok(events)
    }
}

/// Map a syslog priority to an event level name
pub fn level_for(priority: u8) -> &'static str {
    match priority {
        0..=3 => "Error",
        4 => "Warning",
        5 | 6 => "Information",
        _ => "Verbose",
    }
}

/// Parse `journalctl -o json` output, one object per line.
/// Lines that are not JSON or carry no text message are skipped.
pub fn parse_entries(stdout: &str, service: &str, identity: &HostIdentity) -> Vec<ServiceEventLog> {
    stdout
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|entry| {
            let message = entry.get("MESSAGE")?.as_str()?.trim().to_string();
            if message.is_empty() {
                return None;
            }

            let timestamp = entry
                .get("__REALTIME_TIMESTAMP")
                .and_then(Value::as_str)
                .and_then(|micros| micros.parse::<i64>().ok())
                .and_then(DateTime::<Utc>::from_timestamp_micros)
                .unwrap_or_else(Utc::now);

            let priority = entry
                .get("PRIORITY")
                .and_then(Value::as_str)
                .and_then(|p| p.parse::<u8>().ok())
                .unwrap_or(6);

            Some(ServiceEventLog {
                service_name: service.to_string(),
                timestamp,
                message,
                level: level_for(priority).to_string(),
                hostname: identity.hostname.clone(),
                ip: identity.ip.clone(),
            })
        })
        .collect()
}
