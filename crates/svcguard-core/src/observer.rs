use crate::control::{ControlSession, RawState, ServiceHandle};
use crate::types::{ObservedStatus, ServiceSpec, ServiceState};
use tracing::debug;

/// Reads the current state of one configured service
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceObserver;

impl ServiceObserver {
    pub fn new() -> Self {
        Self
    }

    /// Map a raw platform code to the status vocabulary.
    /// Unmapped codes degrade to `state_<N>`, never to an error.
    pub fn map_state(raw: RawState) -> ServiceState {
        match raw {
            RawState::STOPPED => ServiceState::Stopped,
            RawState::RUNNING => ServiceState::Running,
            RawState(code) => ServiceState::Other(code),
        }
    }

    /// Observe a service through an open session.
    ///
    /// Open failures yield `not_found`, query failures `unknown`; both carry
    /// the failure text in `error`. The handle is dropped before returning.
    pub fn observe(&self, session: &dyn ControlSession, spec: &ServiceSpec) -> ObservedStatus {
        let handle = match session.open(&spec.name) {
            Ok(handle) => handle,
            Err(e) => {
                debug!("Failed to open {}: {}", spec.name, e);
                return ObservedStatus::new(&spec.name, ServiceState::NotFound)
                    .with_error(e.to_string());
            }
        };

        match handle.query() {
            Ok(raw) => {
                let status = Self::map_state(raw);
                debug!("{}: raw state {} -> {}", spec.name, raw.code(), status);
                ObservedStatus::new(&spec.name, status)
            }
            Err(e) => {
                debug!("Failed to query {}: {}", spec.name, e);
                ObservedStatus::new(&spec.name, ServiceState::Unknown).with_error(e.to_string())
            }
        }
    }
}
