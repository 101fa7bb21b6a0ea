//! svcguard Core Library
//!
//! Service state reconciliation and remediation: observes configured
//! services, deduplicates what is reported, and starts stopped services
//! when the operator authorized it.

pub mod alert;
pub mod cache;
pub mod control;
pub mod engine;
pub mod error;
#[doc(hidden)]
pub mod mock;
pub mod observer;
pub mod remediation;
pub mod report;
pub mod systemd;
pub mod types;

pub use alert::{AlertEmitter, AlertSink, LogAlertSink};
pub use cache::ReconciliationCache;
pub use control::{ControlSession, RawState, ServiceControl, ServiceHandle};
pub use engine::ReconciliationEngine;
pub use error::{Error, Result};
pub use observer::ServiceObserver;
pub use remediation::{RemediationController, CONFIRM_DELAY};
pub use report::ReportAssembler;
pub use systemd::SystemdControl;
pub use types::{
    AutoStartAlert, EngineStats, HostIdentity, ObservedStatus, RemediationOutcome, ReportRecord,
    ServiceSpec, ServiceState, StartPhase,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
