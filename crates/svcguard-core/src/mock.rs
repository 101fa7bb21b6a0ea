//! In-memory service manager
//!
//! ⚠️ FOR TESTING ONLY. Scripts service states and failures, and counts
//! handle lifetimes so tests can check that every handle is released.

use crate::control::{ControlSession, RawState, ServiceControl, ServiceHandle};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct MockService {
    state: RawState,
    after_start: Option<RawState>,
    query_error: Option<String>,
    start_error: Option<String>,
}

#[derive(Debug, Default)]
struct MockState {
    services: HashMap<String, MockService>,
    connect_error: Option<String>,
    open_handles: usize,
    opens: HashMap<String, usize>,
    queries: HashMap<String, usize>,
    starts: HashMap<String, usize>,
}

/// Scriptable `ServiceControl`; clones share state
#[doc(hidden)]
#[derive(Debug, Clone, Default)]
pub struct MockServiceControl {
    inner: Arc<Mutex<MockState>>,
}

fn lock(inner: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, name: &str, f: impl FnOnce(&mut MockService)) {
        if let Some(service) = lock(&self.inner).services.get_mut(name) {
            f(service);
        }
    }

    pub fn with_service(self, name: &str, state: RawState) -> Self {
        self.set_state(name, state);
        self
    }

    /// State reported by queries after a successful start
    pub fn on_start(self, name: &str, state: RawState) -> Self {
        self.update(name, |s| s.after_start = Some(state));
        self
    }

    pub fn fail_query(self, name: &str, message: &str) -> Self {
        self.update(name, |s| s.query_error = Some(message.to_string()));
        self
    }

    pub fn fail_start(self, name: &str, message: &str) -> Self {
        self.update(name, |s| s.start_error = Some(message.to_string()));
        self
    }

    pub fn fail_connect(self, message: &str) -> Self {
        lock(&self.inner).connect_error = Some(message.to_string());
        self
    }

    /// Install or replace a service, clearing any scripted behavior
    pub fn set_state(&self, name: &str, state: RawState) {
        lock(&self.inner).services.insert(
            name.to_string(),
            MockService {
                state,
                after_start: None,
                query_error: None,
                start_error: None,
            },
        );
    }

    pub fn remove_service(&self, name: &str) {
        lock(&self.inner).services.remove(name);
    }

    pub fn restore_connect(&self) {
        lock(&self.inner).connect_error = None;
    }

    pub fn open_handles(&self) -> usize {
        lock(&self.inner).open_handles
    }

    pub fn open_calls(&self, name: &str) -> usize {
        lock(&self.inner).opens.get(name).copied().unwrap_or(0)
    }

    pub fn query_calls(&self, name: &str) -> usize {
        lock(&self.inner).queries.get(name).copied().unwrap_or(0)
    }

    pub fn start_calls(&self, name: &str) -> usize {
        lock(&self.inner).starts.get(name).copied().unwrap_or(0)
    }
}

impl ServiceControl for MockServiceControl {
    fn connect(&self) -> Result<Box<dyn ControlSession>> {
        if let Some(message) = &lock(&self.inner).connect_error {
            return Err(Error::Connect(message.clone()));
        }
        Ok(Box::new(MockSession {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockSession {
    inner: Arc<Mutex<MockState>>,
}

impl ControlSession for MockSession {
    fn open<'a>(&'a self, name: &str) -> Result<Box<dyn ServiceHandle + 'a>> {
        let mut state = lock(&self.inner);
        *state.opens.entry(name.to_string()).or_insert(0) += 1;
        if !state.services.contains_key(name) {
            return Err(Error::NotFound(name.to_string()));
        }
        state.open_handles += 1;

        Ok(Box::new(MockHandle {
            inner: Arc::clone(&self.inner),
            name: name.to_string(),
        }))
    }
}

struct MockHandle {
    inner: Arc<Mutex<MockState>>,
    name: String,
}

impl ServiceHandle for MockHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self) -> Result<RawState> {
        let mut state = lock(&self.inner);
        *state.queries.entry(self.name.clone()).or_insert(0) += 1;
        let service = state
            .services
            .get(&self.name)
            .ok_or_else(|| Error::Query(format!("{} disappeared", self.name)))?;

        match &service.query_error {
            Some(message) => Err(Error::Query(message.clone())),
            None => Ok(service.state),
        }
    }

    fn start(&self) -> Result<()> {
        let mut state = lock(&self.inner);
        *state.starts.entry(self.name.clone()).or_insert(0) += 1;
        let service = state
            .services
            .get_mut(&self.name)
            .ok_or_else(|| Error::Start(format!("{} disappeared", self.name)))?;

        if let Some(message) = &service.start_error {
            return Err(Error::Start(message.clone()));
        }
        if let Some(next) = service.after_start {
            service.state = next;
        }
        Ok(())
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = lock(&self.inner);
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}
