// End-to-end reconciliation cycles against the in-memory service manager

use std::sync::{Arc, Mutex};
use std::time::Duration;
use svcguard_core::mock::MockServiceControl;
use svcguard_core::{
    AlertEmitter, AlertSink, AutoStartAlert, HostIdentity, RawState, ReconciliationCache,
    ReconciliationEngine, RemediationController, ReportAssembler, Result, ServiceSpec,
    ServiceState,
};

#[derive(Default)]
struct CollectingSink {
    alerts: Mutex<Vec<AutoStartAlert>>,
}

impl CollectingSink {
    fn count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

impl AlertSink for CollectingSink {
    fn deliver(&self, alert: &AutoStartAlert) -> Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

fn build(control: &MockServiceControl) -> (ReconciliationEngine, Arc<CollectingSink>) {
    let identity = HostIdentity::new("pos-01", "10.1.2.3");
    let sink = Arc::new(CollectingSink::default());
    let engine = ReconciliationEngine::new(
        Arc::new(control.clone()),
        AlertEmitter::new(sink.clone(), identity.clone()),
        ReportAssembler::new(identity),
    )
    .with_remediation(RemediationController::new().with_confirm_delay(Duration::ZERO));
    (engine, sink)
}

fn auto_start_spec() -> ServiceSpec {
    ServiceSpec::new("svc1").expecting("running").auto_start()
}

#[test]
fn test_scenario_a_confirmed_auto_start() {
    let control = MockServiceControl::new()
        .with_service("svc1", RawState::STOPPED)
        .on_start("svc1", RawState::RUNNING);
    let (mut engine, sink) = build(&control);

    let records = engine.run_cycle(&[auto_start_spec()]).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].status, ServiceState::Stopped);
    assert_eq!(
        records[0].error,
        "current state 'stopped' differs from expected 'running'"
    );
    assert_eq!(records[1].status, ServiceState::Running);
    assert!(records[1].error.ends_with("started automatically."));
    assert_eq!(sink.count(), 1);
    assert_eq!(
        engine.cache().get("svc1").unwrap().status,
        ServiceState::Running
    );
}

#[test]
fn test_scenario_b_start_failure() {
    let control = MockServiceControl::new()
        .with_service("svc1", RawState::STOPPED)
        .fail_start("svc1", "access is denied");
    let (mut engine, sink) = build(&control);

    let records = engine.run_cycle(&[auto_start_spec()]).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].status, ServiceState::Stopped);
    assert!(records[1].error.contains("| Failed to start: "));
    assert!(records[1].error.contains("access is denied"));
    assert_eq!(sink.count(), 0);
    assert_eq!(control.open_handles(), 0);
}

#[test]
fn test_scenario_c_unchanged_state_reported_once() {
    let control = MockServiceControl::new().with_service("svc1", RawState::RUNNING);
    let (mut engine, _sink) = build(&control);
    let specs = [ServiceSpec::new("svc1")];

    assert_eq!(engine.run_cycle(&specs).unwrap().len(), 1);
    assert!(engine.run_cycle(&specs).unwrap().is_empty());
    assert!(engine.run_cycle(&specs).unwrap().is_empty());
}

#[test]
fn test_scenario_d_filtered_change_still_updates_cache() {
    let control = MockServiceControl::new().with_service("svc1", RawState::RUNNING);
    let (mut engine, _sink) = build(&control);
    let specs = [ServiceSpec::new("svc1").only_reporting("running")];

    assert_eq!(engine.run_cycle(&specs).unwrap().len(), 1);

    control.set_state("svc1", RawState::STOPPED);
    assert!(engine.run_cycle(&specs).unwrap().is_empty());
    assert_eq!(
        engine.cache().get("svc1").unwrap().status,
        ServiceState::Stopped
    );
}

#[test]
fn test_scenario_e_unmapped_code() {
    let control = MockServiceControl::new().with_service("svc1", RawState(2));
    let (mut engine, _sink) = build(&control);

    let records = engine.run_cycle(&[ServiceSpec::new("svc1")]).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status.to_string(), "state_2");
    assert!(records[0].error.is_empty());

    // Against an expectation it always mismatches, without remediation
    let control = MockServiceControl::new().with_service("svc1", RawState(2));
    let (mut engine, _sink) = build(&control);
    let records = engine.run_cycle(&[auto_start_spec()]).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].error.contains("'state_2' differs"));
    assert_eq!(control.start_calls("svc1"), 0);
}

#[test]
fn test_no_expectation_never_remediates() {
    let control = MockServiceControl::new()
        .with_service("svc1", RawState::STOPPED)
        .on_start("svc1", RawState::RUNNING);
    let (mut engine, sink) = build(&control);
    let mut spec = ServiceSpec::new("svc1");
    spec.auto_start_if_stopped = true;

    for _ in 0..3 {
        engine.run_cycle(std::slice::from_ref(&spec)).unwrap();
    }

    assert_eq!(control.start_calls("svc1"), 0);
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_unconfirmed_start_reports_last_observed_state() {
    let control = MockServiceControl::new()
        .with_service("svc1", RawState::STOPPED)
        .on_start("svc1", RawState::START_PENDING);
    let (mut engine, sink) = build(&control);

    let records = engine.run_cycle(&[auto_start_spec()]).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].status, ServiceState::Other(2));
    assert!(records[1].error.contains("unconfirmed"));
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_failed_start_is_retried_next_cycle() {
    let control = MockServiceControl::new()
        .with_service("svc1", RawState::STOPPED)
        .fail_start("svc1", "dependency failed");
    let (mut engine, _sink) = build(&control);
    let specs = [auto_start_spec()];

    engine.run_cycle(&specs).unwrap();
    let records = engine.run_cycle(&specs).unwrap();

    // The cache holds the annotated post-attempt status, so the plain
    // stopped observation of the next cycle counts as a change
    assert_eq!(records.len(), 2);
    assert_eq!(control.start_calls("svc1"), 2);
}

#[test]
fn test_recovery_after_confirmed_start() {
    let control = MockServiceControl::new()
        .with_service("svc1", RawState::STOPPED)
        .on_start("svc1", RawState::RUNNING);
    let (mut engine, _sink) = build(&control);
    let specs = [auto_start_spec()];

    engine.run_cycle(&specs).unwrap();

    let records = engine.run_cycle(&specs).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ServiceState::Running);
    assert!(records[0].error.is_empty());

    assert!(engine.run_cycle(&specs).unwrap().is_empty());
}

#[test]
fn test_shared_cache_survives_engine_rebuild() {
    let cache = Arc::new(ReconciliationCache::new());
    let control = MockServiceControl::new().with_service("svc1", RawState::RUNNING);
    let specs = [ServiceSpec::new("svc1")];

    let (engine, _sink) = build(&control);
    let mut engine = engine.with_cache(Arc::clone(&cache));
    assert_eq!(engine.run_cycle(&specs).unwrap().len(), 1);

    let (engine, _sink) = build(&control);
    let mut engine = engine.with_cache(Arc::clone(&cache));
    assert!(engine.run_cycle(&specs).unwrap().is_empty());
}

#[test]
fn test_connect_failure_then_recovery() {
    let control = MockServiceControl::new()
        .with_service("svc1", RawState::RUNNING)
        .fail_connect("service manager unavailable");
    let (mut engine, _sink) = build(&control);
    let specs = [ServiceSpec::new("svc1")];

    assert!(engine.run_cycle(&specs).is_err());

    control.restore_connect();
    assert_eq!(engine.run_cycle(&specs).unwrap().len(), 1);
}

#[test]
fn test_handles_released_across_cycle() {
    let control = MockServiceControl::new()
        .with_service("a", RawState::RUNNING)
        .with_service("b", RawState::STOPPED)
        .on_start("b", RawState::RUNNING)
        .with_service("c", RawState(7))
        .fail_query("a", "rpc failure");
    let (mut engine, _sink) = build(&control);

    engine
        .run_cycle(&[
            ServiceSpec::new("a"),
            ServiceSpec::new("b").expecting("running").auto_start(),
            ServiceSpec::new("c"),
            ServiceSpec::new("missing"),
        ])
        .unwrap();

    assert_eq!(control.open_handles(), 0);
}
