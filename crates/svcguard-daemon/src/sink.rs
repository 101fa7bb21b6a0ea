//! Report and alert delivery
//!
//! The collector transport lives outside this agent; sinks here spool
//! payloads as JSON lines or log them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use svcguard_core::{AlertSink, AutoStartAlert, ReportRecord, Result};
use tracing::{debug, info, warn};

/// Journal entry attached to a report batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEventLog {
    pub service_name: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub level: String,
    pub hostname: String,
    pub ip: String,
}

/// Payload of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBatch {
    pub service_statuses: Vec<ReportRecord>,
    pub event_logs: Vec<ServiceEventLog>,
}

impl ReportBatch {
    pub fn is_empty(&self) -> bool {
        self.service_statuses.is_empty() && self.event_logs.is_empty()
    }
}

/// External destination for report batches
pub trait ReportSink: Send + Sync {
    fn publish(&self, batch: &ReportBatch) -> Result<()>;
}

/// Appends one JSON document per line
///
/// With a size cap, a full spool is moved to `<file>.1` (replacing the
/// previous one) before the next append.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    max_bytes: u64,
    write_lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: 0,
            write_lock: Mutex::new(()),
        }
    }

    /// Rotate once the file reaches `max_bytes`; 0 never rotates
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rotated_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".1");
        PathBuf::from(name)
    }

    fn rotate_if_full(&self) -> Result<()> {
        if self.max_bytes == 0 {
            return Ok(());
        }
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if len >= self.max_bytes {
            debug!("Rotating {:?} at {} bytes", self.path, len);
            fs::rename(&self.path, self.rotated_path())?;
        }
        Ok(())
    }

    fn append<T: Serialize>(&self, value: &T) -> Result<()> {
        let line = serde_json::to_string(value)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        self.rotate_if_full()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

impl ReportSink for JsonLinesSink {
    fn publish(&self, batch: &ReportBatch) -> Result<()> {
        self.append(batch)
    }
}

impl AlertSink for JsonLinesSink {
    fn deliver(&self, alert: &AutoStartAlert) -> Result<()> {
        self.append(alert)
    }
}

/// Logs every record instead of delivering it
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn publish(&self, batch: &ReportBatch) -> Result<()> {
        for record in &batch.service_statuses {
            if record.error.is_empty() {
                info!(service = %record.service_name, status = %record.status, "service status");
            } else {
                warn!(
                    service = %record.service_name,
                    status = %record.status,
                    error = %record.error,
                    "service status"
                );
            }
        }
        for event in &batch.event_logs {
            info!(service = %event.service_name, level = %event.level, "{}", event.message);
        }
        Ok(())
    }
}

/// Publishes to several sinks; every sink is tried, the first error is returned
pub struct FanoutSink {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn ReportSink>>) -> Self {
        Self { sinks }
    }
}

impl ReportSink for FanoutSink {
    fn publish(&self, batch: &ReportBatch) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(batch) {
                warn!("Report sink failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
