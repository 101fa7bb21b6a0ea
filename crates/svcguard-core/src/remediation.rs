use crate::control::{ControlSession, ServiceHandle};
use crate::observer::ServiceObserver;
use crate::types::{ObservedStatus, RemediationOutcome, ServiceSpec, ServiceState, StartPhase};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Wait between a start request and the confirmation query
pub const CONFIRM_DELAY: Duration = Duration::from_secs(3);

pub const STARTED_NOTE: &str = " | Service started automatically.";

/// Starts a stopped service and confirms the transition
#[derive(Debug, Clone)]
pub struct RemediationController {
    confirm_delay: Duration,
}

impl Default for RemediationController {
    fn default() -> Self {
        Self::new()
    }
}

impl RemediationController {
    pub fn new() -> Self {
        Self {
            confirm_delay: CONFIRM_DELAY,
        }
    }

    /// Override the confirmation wait (tests use `Duration::ZERO`)
    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    pub fn confirm_delay(&self) -> Duration {
        self.confirm_delay
    }

    /// Attempt to start the service and classify the outcome.
    ///
    /// Algorithm:
    /// 1. Open the service once; the handle spans all following steps
    /// 2. Request a start (failure -> `Failed`, status stays `stopped`)
    /// 3. Wait `confirm_delay`
    /// 4. Re-query: running -> `Confirmed`, anything else -> `Unconfirmed`
    ///
    /// Failures never escape; they are appended to the returned status' error.
    pub fn remediate(
        &self,
        session: &dyn ControlSession,
        spec: &ServiceSpec,
        observed: &ObservedStatus,
    ) -> (ObservedStatus, RemediationOutcome) {
        let mut status = observed.clone();
        let mut outcome = RemediationOutcome::starting();

        let handle = match session.open(&spec.name) {
            Ok(handle) => handle,
            Err(e) => {
                error!("Cannot open {} for start: {}", spec.name, e);
                return Self::failed(status, outcome, &e.to_string());
            }
        };

        info!("Starting service {}", handle.name());
        if let Err(e) = handle.start() {
            error!("Failed to start {}: {}", spec.name, e);
            return Self::failed(status, outcome, &e.to_string());
        }
        outcome.started = true;

        thread::sleep(self.confirm_delay);

        status.timestamp = chrono::Utc::now();
        match handle.query() {
            Ok(raw) if raw.is_running() => {
                info!("Service {} confirmed running", spec.name);
                status.status = ServiceState::Running;
                outcome.confirmed = true;
                outcome.phase = StartPhase::Confirmed;
                outcome.detail = STARTED_NOTE.to_string();
            }
            Ok(raw) => {
                status.status = ServiceObserver::map_state(raw);
                warn!(
                    "Start of {} not confirmed after {:?}: state is '{}'",
                    spec.name, self.confirm_delay, status.status
                );
                outcome.phase = StartPhase::Unconfirmed;
                outcome.detail = format!(" | Start attempt unconfirmed: state is '{}'", status.status);
            }
            Err(e) => {
                warn!("Confirmation query for {} failed: {}", spec.name, e);
                outcome.phase = StartPhase::Unconfirmed;
                outcome.detail = format!(" | Start attempt unconfirmed: {}", e);
            }
        }

        status.annotate(&outcome.detail);
        (status, outcome)
    }

    fn failed(
        mut status: ObservedStatus,
        mut outcome: RemediationOutcome,
        detail: &str,
    ) -> (ObservedStatus, RemediationOutcome) {
        outcome.phase = StartPhase::Failed;
        outcome.detail = format!(" | Failed to start: {}", detail);
        status.annotate(&outcome.detail);
        (status, outcome)
    }
}
