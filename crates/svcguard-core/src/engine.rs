use crate::alert::AlertEmitter;
use crate::cache::ReconciliationCache;
use crate::control::{ControlSession, ServiceControl};
use crate::observer::ServiceObserver;
use crate::remediation::RemediationController;
use crate::report::ReportAssembler;
use crate::types::{EngineStats, HostIdentity, ObservedStatus, ReportRecord, ServiceSpec};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-cycle reconciliation of configured services
///
/// Each cycle, for every spec in declaration order:
/// 1. Observe the service
/// 2. Compare against the cache; unchanged and error-free -> skip
/// 3. Annotate a mismatch against the expected status and report it
/// 4. On an authorized mismatch, remediate and report the outcome as a
///    second record, caching the post-attempt status
/// 5. Otherwise report the observation as is
pub struct ReconciliationEngine {
    control: Arc<dyn ServiceControl>,
    cache: Arc<ReconciliationCache>,
    observer: ServiceObserver,
    remediation: RemediationController,
    alerts: AlertEmitter,
    assembler: ReportAssembler,
    stats: EngineStats,
}

impl ReconciliationEngine {
    pub fn new(
        control: Arc<dyn ServiceControl>,
        alerts: AlertEmitter,
        assembler: ReportAssembler,
    ) -> Self {
        Self {
            control,
            cache: Arc::new(ReconciliationCache::new()),
            observer: ServiceObserver::new(),
            remediation: RemediationController::new(),
            alerts,
            assembler,
            stats: EngineStats::new(),
        }
    }

    /// Share an externally owned cache
    pub fn with_cache(mut self, cache: Arc<ReconciliationCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_remediation(mut self, remediation: RemediationController) -> Self {
        self.remediation = remediation;
        self
    }

    /// Host identity stamped on records and alerts from the next cycle on
    pub fn set_identity(&mut self, identity: HostIdentity) {
        self.alerts.set_identity(identity.clone());
        self.assembler.set_identity(identity);
    }

    pub fn cache(&self) -> &Arc<ReconciliationCache> {
        &self.cache
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Run one reconciliation cycle.
    ///
    /// Only a failure to reach the service manager is returned as an error;
    /// every per-service failure is folded into that service's record.
    pub fn run_cycle(&mut self, specs: &[ServiceSpec]) -> Result<Vec<ReportRecord>> {
        let session = match self.control.connect() {
            Ok(session) => session,
            Err(e) => {
                error!("Cannot connect to service manager: {}", e);
                self.stats.record_failed_cycle();
                return Err(e);
            }
        };

        let mut observations = Vec::new();
        for spec in specs {
            observations.extend(self.reconcile(session.as_ref(), spec));
        }
        drop(session);

        let by_name: HashMap<String, ServiceSpec> = specs
            .iter()
            .map(|spec| (spec.name.clone(), spec.clone()))
            .collect();
        let records = self.assembler.assemble(&observations, &by_name);

        self.stats.record_cycle(records.len());
        debug!(
            "Cycle #{} complete: {} observations, {} records",
            self.stats.total_cycles,
            observations.len(),
            records.len()
        );

        Ok(records)
    }

    /// Reconcile one service; returns zero, one or two observations to report
    fn reconcile(&mut self, session: &dyn ControlSession, spec: &ServiceSpec) -> Vec<ObservedStatus> {
        let mut observed = self.observer.observe(session, spec);

        let changed = self.cache.compare_and_set(&spec.name, &observed);
        if !changed && !observed.has_error() {
            debug!("{}: unchanged ({}), skipping", spec.name, observed.status);
            return Vec::new();
        }

        if !spec.is_mismatch(observed.status) {
            return vec![observed];
        }

        let mismatch = format!(
            "current state '{}' differs from expected '{}'",
            observed.status, spec.expected_status
        );
        warn!("{}: {}", spec.name, mismatch);
        if observed.has_error() {
            observed.annotate(" | ");
        }
        observed.annotate(&mismatch);

        if !spec.authorizes_start(observed.status) {
            return vec![observed];
        }

        let (after, outcome) = self.remediation.remediate(session, spec, &observed);
        self.stats.record_remediation(&outcome);
        if outcome.confirmed {
            self.alerts.emit(&spec.name, after.timestamp);
            self.stats.record_alert();
        }
        info!(
            "{}: remediation {:?}, status now '{}'",
            spec.name, outcome.phase, after.status
        );

        self.cache.store(&spec.name, &after);
        vec![observed, after]
    }
}
