use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use svcguard_core::{ServiceSpec, ServiceState};

/// Prefix for environment overrides, e.g. `SVCGUARD__AGENT__POLL_INTERVAL_SECS=30`
pub const ENV_PREFIX: &str = "SVCGUARD";

/// Main configuration for the svcguard daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Polling and host identity
    #[serde(default)]
    pub agent: AgentConfig,

    /// Where reports and alerts are spooled
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,

    /// Services to watch, checked in this order
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
}

/// Polling and host identity settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Seconds between reconciliation cycles (default: 60)
    pub poll_interval_secs: u64,

    /// Hostname override, detected when empty
    pub hostname: String,

    /// IP override, detected when empty
    pub ip: String,
}

/// Report and alert output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON-lines spool for report batches (default: ./spool/reports.jsonl)
    pub reports_path: PathBuf,

    /// JSON-lines spool for auto-start alerts (default: ./spool/alerts.jsonl)
    pub alerts_path: PathBuf,

    /// Batches that no report sink accepted (default: ./spool/failed.jsonl)
    pub failed_path: PathBuf,

    /// Spool size that triggers rotation to `<file>.1`; 0 disables (default: 10 MiB)
    pub spool_max_bytes: u64,

    /// How far back journal entries are collected (default: 10)
    pub event_log_minutes: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log directory path (default: ./logs/)
    pub log_dir: PathBuf,

    /// Daemon log file name (default: svcguard-daemon.log)
    pub file_name: String,

    /// Filter used when RUST_LOG is unset (default: info)
    pub level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            hostname: String::new(),
            ip: String::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            reports_path: PathBuf::from("./spool/reports.jsonl"),
            alerts_path: PathBuf::from("./spool/alerts.jsonl"),
            failed_path: PathBuf::from("./spool/failed.jsonl"),
            spool_max_bytes: 10 * 1024 * 1024,
            event_log_minutes: 10,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            file_name: "svcguard-daemon.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults plus one sample service, used by `generate-config`
    pub fn example() -> Self {
        Self {
            services: vec![ServiceSpec::new("cups.service")
                .expecting("running")
                .auto_start()],
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file, then apply environment overrides
    ///
    /// # Example
    /// ```no_run
    /// use svcguard_daemon::config::Config;
    ///
    /// let config = Config::load_from_file("/etc/svcguard/config.toml").unwrap();
    /// println!("Poll interval: {}s", config.agent.poll_interval_secs);
    /// ```
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path.as_ref().to_path_buf()).format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.agent.poll_interval_secs == 0 {
            return Err("Poll interval must be > 0".to_string());
        }

        if self.output.event_log_minutes == 0 {
            return Err("Event log window must be > 0 minutes".to_string());
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err("Service name must not be empty".to_string());
            }

            if !seen.insert(service.name.as_str()) {
                return Err(format!("Duplicate service name: {}", service.name));
            }

            match service.expected_status.as_str() {
                "" | "running" | "stopped" => {}
                other => {
                    return Err(format!(
                        "Service {}: expected_status must be running, stopped or empty, got: {}",
                        service.name, other
                    ))
                }
            }

            if !service.only_report.is_empty()
                && service.only_report.parse::<ServiceState>().is_err()
            {
                return Err(format!(
                    "Service {}: only_report is not a known status: {}",
                    service.name, service.only_report
                ));
            }
        }

        Ok(())
    }
}
