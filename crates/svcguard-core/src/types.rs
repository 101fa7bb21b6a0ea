use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Status vocabulary reported for a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ServiceState {
    Running,
    Stopped,
    NotFound,
    Unknown,
    /// Raw state code with no named mapping, rendered as `state_<N>`
    Other(u32),
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Running => write!(f, "running"),
            ServiceState::Stopped => write!(f, "stopped"),
            ServiceState::NotFound => write!(f, "not_found"),
            ServiceState::Unknown => write!(f, "unknown"),
            ServiceState::Other(code) => write!(f, "state_{}", code),
        }
    }
}

impl FromStr for ServiceState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ServiceState::Running),
            "stopped" => Ok(ServiceState::Stopped),
            "not_found" => Ok(ServiceState::NotFound),
            "unknown" => Ok(ServiceState::Unknown),
            other => other
                .strip_prefix("state_")
                .and_then(|code| code.parse::<u32>().ok())
                .map(ServiceState::Other)
                .ok_or_else(|| Error::Parse(format!("unknown service status '{}'", s))),
        }
    }
}

impl From<ServiceState> for String {
    fn from(state: ServiceState) -> Self {
        state.to_string()
    }
}

impl TryFrom<String> for ServiceState {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Operator-declared expectations for one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,

    /// Empty means no expectation
    #[serde(default)]
    pub expected_status: String,

    #[serde(default)]
    pub auto_start_if_stopped: bool,

    /// Empty means report every status
    #[serde(default)]
    pub only_report: String,

    /// Attach recent journal entries to the report batch
    #[serde(default)]
    pub fetch_event_logs: bool,
}

impl ServiceSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            expected_status: String::new(),
            auto_start_if_stopped: false,
            only_report: String::new(),
            fetch_event_logs: false,
        }
    }

    pub fn expecting(mut self, status: &str) -> Self {
        self.expected_status = status.to_string();
        self
    }

    pub fn auto_start(mut self) -> Self {
        self.auto_start_if_stopped = true;
        self
    }

    pub fn only_reporting(mut self, status: &str) -> Self {
        self.only_report = status.to_string();
        self
    }

    // Does the observed state differ from a declared expectation?
    pub fn is_mismatch(&self, state: ServiceState) -> bool {
        !self.expected_status.is_empty() && state.to_string() != self.expected_status
    }

    // Only "expected running, found stopped, auto-start on" is acted upon
    pub fn authorizes_start(&self, state: ServiceState) -> bool {
        self.auto_start_if_stopped
            && self.expected_status == "running"
            && state == ServiceState::Stopped
    }

    // Passes the only-report filter?
    pub fn reports(&self, state: ServiceState) -> bool {
        self.only_report.is_empty() || self.only_report == state.to_string()
    }
}

/// One observation of a service, also the unit stored in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedStatus {
    pub name: String,
    pub status: ServiceState,
    #[serde(default)]
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ObservedStatus {
    pub fn new(name: &str, status: ServiceState) -> Self {
        Self {
            name: name.to_string(),
            status,
            error: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    // Change detection ignores the timestamp
    pub fn same_as(&self, other: &ObservedStatus) -> bool {
        self.status == other.status && self.error == other.error
    }

    pub fn annotate(&mut self, note: &str) {
        self.error.push_str(note);
    }
}

/// Phase reached by a start attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPhase {
    Starting,
    Failed,
    Confirmed,
    Unconfirmed,
}

/// Result of one remediation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationOutcome {
    pub attempted: bool,
    pub started: bool,
    pub confirmed: bool,
    pub phase: StartPhase,
    pub detail: String,
}

impl RemediationOutcome {
    pub fn starting() -> Self {
        Self {
            attempted: true,
            started: false,
            confirmed: false,
            phase: StartPhase::Starting,
            detail: String::new(),
        }
    }
}

/// Host the agent runs on, supplied by the environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    pub hostname: String,
    pub ip: String,
}

impl HostIdentity {
    pub fn new(hostname: &str, ip: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            ip: ip.to_string(),
        }
    }
}

/// Status record handed to the report transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub hostname: String,
    pub ip: String,
    pub service_name: String,
    pub status: ServiceState,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Notification sent after a confirmed automatic start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoStartAlert {
    pub service_name: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub hostname: String,
    pub ip: String,
}

/// Engine counters
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub total_cycles: u64,
    pub failed_cycles: u64,
    pub total_records: u64,
    pub remediation_attempts: u64,
    pub remediation_confirmed: u64,
    pub remediation_unconfirmed: u64,
    pub remediation_failed: u64,
    pub alerts_emitted: u64,
    pub last_cycle: Option<DateTime<Utc>>,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&mut self, records: usize) {
        self.total_cycles += 1;
        self.total_records += records as u64;
        self.last_cycle = Some(Utc::now());
    }

    pub fn record_failed_cycle(&mut self) {
        self.total_cycles += 1;
        self.failed_cycles += 1;
        self.last_cycle = Some(Utc::now());
    }

    pub fn record_remediation(&mut self, outcome: &RemediationOutcome) {
        self.remediation_attempts += 1;
        match outcome.phase {
            StartPhase::Confirmed => self.remediation_confirmed += 1,
            StartPhase::Unconfirmed => self.remediation_unconfirmed += 1,
            StartPhase::Failed | StartPhase::Starting => self.remediation_failed += 1,
        }
    }

    pub fn record_alert(&mut self) {
        self.alerts_emitted += 1;
    }
}
