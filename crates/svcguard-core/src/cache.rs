//! Last reported status per service
//!
//! Process-lifetime keyed store. Entries are created on first observation,
//! overwritten on change and never removed; a restart clears all history so
//! the first observation of every service is reported again.

use crate::types::ObservedStatus;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct ReconciliationCache {
    entries: Mutex<HashMap<String, ObservedStatus>>,
}

impl ReconciliationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ObservedStatus>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, name: &str) -> Option<ObservedStatus> {
        self.lock().get(name).cloned()
    }

    /// Store `status` if it differs from the entry for `name`.
    ///
    /// Returns true when there was no entry or when status or error changed.
    /// Read and write happen under one lock acquisition.
    pub fn compare_and_set(&self, name: &str, status: &ObservedStatus) -> bool {
        let mut entries = self.lock();
        match entries.get(name) {
            Some(previous) if previous.same_as(status) => false,
            _ => {
                entries.insert(name.to_string(), status.clone());
                true
            }
        }
    }

    /// Unconditionally record `status` as the last reported one
    pub fn store(&self, name: &str, status: &ObservedStatus) {
        self.lock().insert(name.to_string(), status.clone());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServiceState;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_first_observation_is_change() {
        let cache = ReconciliationCache::new();
        let status = ObservedStatus::new("svc", ServiceState::Running);

        assert!(cache.get("svc").is_none());
        assert!(cache.compare_and_set("svc", &status));
        assert_eq!(cache.get("svc").unwrap().status, ServiceState::Running);
    }

    #[test]
    fn test_unchanged_observation() {
        let cache = ReconciliationCache::new();
        let status = ObservedStatus::new("svc", ServiceState::Running);
        cache.compare_and_set("svc", &status);

        let again = ObservedStatus::new("svc", ServiceState::Running);
        assert!(!cache.compare_and_set("svc", &again));
        // Stored entry keeps the originally reported timestamp
        assert_eq!(cache.get("svc").unwrap().timestamp, status.timestamp);
    }

    #[test]
    fn test_status_change_detected() {
        let cache = ReconciliationCache::new();
        cache.compare_and_set("svc", &ObservedStatus::new("svc", ServiceState::Running));

        assert!(cache.compare_and_set("svc", &ObservedStatus::new("svc", ServiceState::Stopped)));
        assert_eq!(cache.get("svc").unwrap().status, ServiceState::Stopped);
    }

    #[test]
    fn test_error_change_detected() {
        let cache = ReconciliationCache::new();
        cache.compare_and_set("svc", &ObservedStatus::new("svc", ServiceState::Unknown));

        let with_error = ObservedStatus::new("svc", ServiceState::Unknown).with_error("timeout");
        assert!(cache.compare_and_set("svc", &with_error));
        assert!(!cache.compare_and_set("svc", &with_error));
    }

    #[test]
    fn test_keys_are_independent() {
        let cache = ReconciliationCache::new();
        cache.compare_and_set("a", &ObservedStatus::new("a", ServiceState::Running));

        assert!(cache.compare_and_set("b", &ObservedStatus::new("b", ServiceState::Running)));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_store_overwrites() {
        let cache = ReconciliationCache::new();
        cache.compare_and_set("svc", &ObservedStatus::new("svc", ServiceState::Stopped));
        cache.store("svc", &ObservedStatus::new("svc", ServiceState::Running));

        assert_eq!(cache.get("svc").unwrap().status, ServiceState::Running);
    }

    #[test]
    fn test_concurrent_compare_and_set_reports_once() {
        let cache = Arc::new(ReconciliationCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache.compare_and_set("svc", &ObservedStatus::new("svc", ServiceState::Stopped))
                })
            })
            .collect();

        let changes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|changed| *changed)
            .count();

        assert_eq!(changes, 1);
    }
}
