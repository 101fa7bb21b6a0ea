//! Service-control capability
//!
//! Narrow interface over the platform service manager. Reconciliation code
//! depends only on these traits, never on platform handle types.
//!
//! Closing a service handle is its `Drop`: a handle is released when it goes
//! out of scope, on every exit path.

use crate::Result;

/// Raw numeric service state as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawState(pub u32);

impl RawState {
    pub const STOPPED: RawState = RawState(1);
    pub const START_PENDING: RawState = RawState(2);
    pub const STOP_PENDING: RawState = RawState(3);
    pub const RUNNING: RawState = RawState(4);
    pub const CONTINUE_PENDING: RawState = RawState(5);
    pub const PAUSE_PENDING: RawState = RawState(6);
    pub const PAUSED: RawState = RawState(7);

    pub fn code(&self) -> u32 {
        self.0
    }

    pub fn is_running(&self) -> bool {
        *self == RawState::RUNNING
    }
}

/// Entry point to the platform service manager
pub trait ServiceControl: Send + Sync {
    /// Connect to the service manager. Failure aborts the whole cycle.
    fn connect(&self) -> Result<Box<dyn ControlSession>>;
}

/// Open connection to the service manager, dropped to disconnect
pub trait ControlSession {
    /// Open a named service, `Error::NotFound` when it does not exist
    fn open<'a>(&'a self, name: &str) -> Result<Box<dyn ServiceHandle + 'a>>;
}

/// Scoped handle to one service
pub trait ServiceHandle {
    fn name(&self) -> &str;

    fn query(&self) -> Result<RawState>;

    /// Request a start; returns once the manager acknowledged the request
    fn start(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_state_codes() {
        assert_eq!(RawState::STOPPED.code(), 1);
        assert_eq!(RawState::RUNNING.code(), 4);
        assert!(RawState::RUNNING.is_running());
        assert!(!RawState::START_PENDING.is_running());
        assert!(!RawState(0).is_running());
    }
}
