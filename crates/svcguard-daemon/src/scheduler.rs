use crate::config::Config;
use crate::identity;
use crate::journal::JournalReader;
use crate::sink::{
    FanoutSink, JsonLinesSink, LogReportSink, ReportBatch, ReportSink, ServiceEventLog,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use svcguard_core::{
    AlertEmitter, EngineStats, HostIdentity, ReconciliationEngine, ReportAssembler, ReportRecord,
    ServiceControl, ServiceSpec, SystemdControl,
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Produces the host identity for the next cycle
pub type IdentitySource = Box<dyn Fn() -> HostIdentity + Send + Sync>;

/// Drives one reconciliation cycle per poll interval
///
/// Services are checked sequentially inside a cycle. Cancellation is only
/// observed between cycles, so a started confirmation wait always completes.
pub struct Scheduler {
    engine: ReconciliationEngine,
    specs: Vec<ServiceSpec>,
    interval: Duration,
    reports: Arc<dyn ReportSink>,
    failed: Option<Arc<dyn ReportSink>>,
    journal: Option<JournalReader>,
    identity: HostIdentity,
    identity_source: Option<IdentitySource>,
}

impl Scheduler {
    pub fn new(
        engine: ReconciliationEngine,
        specs: Vec<ServiceSpec>,
        interval: Duration,
        reports: Arc<dyn ReportSink>,
        identity: HostIdentity,
    ) -> Self {
        Self {
            engine,
            specs,
            interval,
            reports,
            failed: None,
            journal: None,
            identity,
            identity_source: None,
        }
    }

    /// Re-resolve the host identity before every cycle
    pub fn with_identity_source(
        mut self,
        source: impl Fn() -> HostIdentity + Send + Sync + 'static,
    ) -> Self {
        self.identity_source = Some(Box::new(source));
        self
    }

    /// Keep batches the report sink rejected
    pub fn with_failed_spool(mut self, failed: Arc<dyn ReportSink>) -> Self {
        self.failed = Some(failed);
        self
    }

    /// Collect journal entries for services with `fetch_event_logs`
    pub fn with_journal(mut self, journal: JournalReader) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Build the production scheduler: systemd control, spool sinks
    pub fn from_config(config: &Config) -> Self {
        let identity = identity::resolve(&config.agent);
        info!(
            "Host identity: hostname={}, ip={}",
            identity.hostname, identity.ip
        );

        let output = &config.output;
        let control: Arc<dyn ServiceControl> = Arc::new(SystemdControl::new());
        let alerts = AlertEmitter::new(
            Arc::new(JsonLinesSink::new(&output.alerts_path).with_max_bytes(output.spool_max_bytes)),
            identity.clone(),
        );
        let engine = ReconciliationEngine::new(control, alerts, ReportAssembler::new(identity.clone()));

        let reports: Arc<dyn ReportSink> = Arc::new(FanoutSink::new(vec![
            Box::new(LogReportSink),
            Box::new(JsonLinesSink::new(&output.reports_path).with_max_bytes(output.spool_max_bytes)),
        ]));
        let failed = Arc::new(JsonLinesSink::new(&output.failed_path).with_max_bytes(output.spool_max_bytes));

        let agent = config.agent.clone();
        Self::new(
            engine,
            config.services.clone(),
            Duration::from_secs(config.agent.poll_interval_secs),
            reports,
            identity,
        )
        .with_identity_source(move || identity::resolve(&agent))
        .with_failed_spool(failed)
        .with_journal(JournalReader::new(output.event_log_minutes))
    }

    pub fn stats(&self) -> &EngineStats {
        self.engine.stats()
    }

    fn refresh_identity(&mut self) {
        let Some(source) = &self.identity_source else {
            return;
        };

        let identity = source();
        if identity != self.identity {
            info!(
                "Host identity changed: hostname={}, ip={}",
                identity.hostname, identity.ip
            );
            self.engine.set_identity(identity.clone());
            self.identity = identity;
        }
    }

    /// Run one cycle and publish its batch.
    ///
    /// Returns `None` when the service manager was unreachable.
    pub fn run_once(&mut self) -> Option<ReportBatch> {
        self.refresh_identity();

        let records = match self.engine.run_cycle(&self.specs) {
            Ok(records) => records,
            Err(e) => {
                error!("Reconciliation cycle failed: {}", e);
                return None;
            }
        };

        let batch = ReportBatch {
            event_logs: self.collect_event_logs(&records),
            service_statuses: records,
        };

        if batch.is_empty() {
            debug!("Nothing changed, no report published");
        } else if let Err(e) = self.reports.publish(&batch) {
            error!("Failed to publish report: {}", e);
            self.keep_failed(&batch);
        }

        Some(batch)
    }

    /// Spool a rejected batch; without a spool its payload goes to the log
    fn keep_failed(&self, batch: &ReportBatch) {
        let payload = || serde_json::to_string(batch).unwrap_or_default();
        match &self.failed {
            Some(failed) => {
                if let Err(e) = failed.publish(batch) {
                    error!("Failed to spool undelivered report: {} (payload: {})", e, payload());
                }
            }
            None => error!("Undelivered report: {}", payload()),
        }
    }

    fn collect_event_logs(&self, records: &[ReportRecord]) -> Vec<ServiceEventLog> {
        let Some(journal) = &self.journal else {
            return Vec::new();
        };

        let wanted: HashSet<&str> = self
            .specs
            .iter()
            .filter(|spec| spec.fetch_event_logs)
            .map(|spec| spec.name.as_str())
            .collect();

        let mut seen = HashSet::new();
        let mut events = Vec::new();
        for record in records {
            let name = record.service_name.as_str();
            if !wanted.contains(name) || !seen.insert(name) {
                continue;
            }
            match journal.fetch(name, &self.identity) {
                Ok(mut found) => events.append(&mut found),
                Err(e) => warn!("Failed to collect journal entries for {}: {}", name, e),
            }
        }
        events
    }

    /// Poll until `cancel` fires. The first cycle runs immediately.
    ///
    /// Needs a multi-threaded runtime: cycles run in `block_in_place`.
    pub async fn run(mut self, cancel: CancellationToken) -> EngineStats {
        info!(
            "Watching {} services every {}",
            self.specs.len(),
            humantime::format_duration(self.interval)
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            tokio::task::block_in_place(|| self.run_once());

            let stats = self.engine.stats();
            info!(
                "Stats: cycles={}, failed={}, records={}, starts={}/{} confirmed",
                stats.total_cycles,
                stats.failed_cycles,
                stats.total_records,
                stats.remediation_confirmed,
                stats.remediation_attempts
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        info!("Polling stopped");
        self.engine.stats().clone()
    }
}
