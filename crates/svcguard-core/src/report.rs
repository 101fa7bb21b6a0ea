use crate::types::{HostIdentity, ObservedStatus, ReportRecord, ServiceSpec};
use std::collections::HashMap;
use tracing::debug;

/// Shapes observations of one cycle into report records
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    identity: HostIdentity,
}

impl ReportAssembler {
    pub fn new(identity: HostIdentity) -> Self {
        Self { identity }
    }

    /// Stamp records built from now on with a different host identity
    pub fn set_identity(&mut self, identity: HostIdentity) {
        self.identity = identity;
    }

    /// Apply the only-report filter and build records, preserving order.
    ///
    /// Observations without a matching spec are reported unfiltered.
    pub fn assemble(
        &self,
        observations: &[ObservedStatus],
        specs: &HashMap<String, ServiceSpec>,
    ) -> Vec<ReportRecord> {
        observations
            .iter()
            .filter(|observed| match specs.get(&observed.name) {
                Some(spec) if !spec.reports(observed.status) => {
                    debug!(
                        "{}: status '{}' filtered by only_report '{}'",
                        observed.name, observed.status, spec.only_report
                    );
                    false
                }
                _ => true,
            })
            .map(|observed| self.record(observed))
            .collect()
    }

    pub fn record(&self, observed: &ObservedStatus) -> ReportRecord {
        ReportRecord {
            hostname: self.identity.hostname.clone(),
            ip: self.identity.ip.clone(),
            service_name: observed.name.clone(),
            status: observed.status,
            timestamp: observed.timestamp,
            error: observed.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServiceState;

    fn specs(list: &[ServiceSpec]) -> HashMap<String, ServiceSpec> {
        list.iter().map(|s| (s.name.clone(), s.clone())).collect()
    }

    #[test]
    fn test_assemble_copies_fields() {
        let assembler = ReportAssembler::new(HostIdentity::new("db01", "192.168.1.20"));
        let observed = ObservedStatus::new("postgresql", ServiceState::Running).with_error("note");

        let records = assembler.assemble(
            std::slice::from_ref(&observed),
            &specs(&[ServiceSpec::new("postgresql")]),
        );

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.hostname, "db01");
        assert_eq!(record.ip, "192.168.1.20");
        assert_eq!(record.service_name, "postgresql");
        assert_eq!(record.status, ServiceState::Running);
        assert_eq!(record.timestamp, observed.timestamp);
        assert_eq!(record.error, "note");
    }

    #[test]
    fn test_identity_change_applies_to_later_records() {
        let mut assembler = ReportAssembler::new(HostIdentity::new("db01", ""));
        let observed = ObservedStatus::new("postgresql", ServiceState::Running);

        let before = assembler.record(&observed);
        assembler.set_identity(HostIdentity::new("db01", "192.168.1.21"));
        let after = assembler.record(&observed);

        assert_eq!(before.ip, "");
        assert_eq!(after.ip, "192.168.1.21");
    }

    #[test]
    fn test_only_report_drops_other_statuses() {
        let assembler = ReportAssembler::default();
        let spec = ServiceSpec::new("svc").only_reporting("running");

        let records = assembler.assemble(
            &[ObservedStatus::new("svc", ServiceState::Stopped)],
            &specs(&[spec]),
        );

        assert!(records.is_empty());
    }

    #[test]
    fn test_filter_applies_per_record_in_order() {
        let assembler = ReportAssembler::default();
        let spec = ServiceSpec::new("svc").only_reporting("running");
        let observations = vec![
            ObservedStatus::new("svc", ServiceState::Stopped),
            ObservedStatus::new("svc", ServiceState::Running),
            ObservedStatus::new("other", ServiceState::Stopped),
        ];

        let records = assembler.assemble(
            &observations,
            &specs(&[spec, ServiceSpec::new("other")]),
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, ServiceState::Running);
        assert_eq!(records[1].service_name, "other");
    }
}
