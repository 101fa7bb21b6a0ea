//! svcguard Daemon
//!
//! Host agent: polls configured services, spools status reports and
//! auto-start alerts, and restarts stopped services when authorized.

pub mod config;
pub mod identity;
pub mod journal;
pub mod scheduler;
pub mod shutdown;
pub mod sink;

pub use config::Config;
pub use scheduler::Scheduler;
pub use sink::{JsonLinesSink, ReportBatch, ReportSink, ServiceEventLog};
