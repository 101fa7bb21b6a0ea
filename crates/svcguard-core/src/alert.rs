use crate::types::{AutoStartAlert, HostIdentity};
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub const AUTO_START_MESSAGE: &str = "Service was started automatically by the monitor.";

/// External destination for auto-start alerts
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &AutoStartAlert) -> Result<()>;
}

/// Logs alerts instead of sending them anywhere
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn deliver(&self, alert: &AutoStartAlert) -> Result<()> {
        info!(
            service = %alert.service_name,
            host = %alert.hostname,
            "{}",
            alert.message
        );
        Ok(())
    }
}

/// Builds alert payloads and hands them to a sink
#[derive(Clone)]
pub struct AlertEmitter {
    sink: Arc<dyn AlertSink>,
    identity: HostIdentity,
}

impl AlertEmitter {
    pub fn new(sink: Arc<dyn AlertSink>, identity: HostIdentity) -> Self {
        Self { sink, identity }
    }

    pub fn set_identity(&mut self, identity: HostIdentity) {
        self.identity = identity;
    }

    pub fn alert_for(&self, service_name: &str, at: DateTime<Utc>) -> AutoStartAlert {
        AutoStartAlert {
            service_name: service_name.to_string(),
            timestamp: at,
            message: AUTO_START_MESSAGE.to_string(),
            hostname: self.identity.hostname.clone(),
            ip: self.identity.ip.clone(),
        }
    }

    /// Emit an alert for a confirmed start. Delivery failures are logged only.
    pub fn emit(&self, service_name: &str, at: DateTime<Utc>) -> AutoStartAlert {
        let alert = self.alert_for(service_name, at);
        if let Err(e) = self.sink.deliver(&alert) {
            warn!(
                "Failed to deliver auto-start alert for {}: {} (payload: {})",
                service_name,
                e,
                serde_json::to_string(&alert).unwrap_or_default()
            );
        }
        alert
    }
}
