use crate::control::{ControlSession, RawState, ServiceControl, ServiceHandle};
use crate::{Error, Result};
use std::process::{Command, Output};
use tracing::debug;

/// Service-control capability backed by `systemctl`
#[derive(Debug, Clone)]
pub struct SystemdControl {
    systemctl: String,
}

impl Default for SystemdControl {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemdControl {
    pub fn new() -> Self {
        Self {
            systemctl: "systemctl".to_string(),
        }
    }

    /// Use a different systemctl binary (e.g. a wrapper script)
    pub fn with_binary(binary: &str) -> Self {
        Self {
            systemctl: binary.to_string(),
        }
    }

    /// Map a unit's ActiveState onto the raw state codes
    pub fn raw_state_for(active_state: &str) -> RawState {
        match active_state.trim() {
            "active" => RawState::RUNNING,
            "inactive" | "failed" => RawState::STOPPED,
            "activating" => RawState::START_PENDING,
            "deactivating" => RawState::STOP_PENDING,
            "reloading" => RawState::CONTINUE_PENDING,
            _ => RawState(0),
        }
    }

    /// Extract `value` from `Key=value` output of `systemctl show`
    fn property(stdout: &str, key: &str) -> Option<String> {
        stdout.lines().find_map(|line| {
            line.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|value| value.trim().to_string())
        })
    }
}

impl ServiceControl for SystemdControl {
    fn connect(&self) -> Result<Box<dyn ControlSession>> {
        // `--version` never reaches the bus; `show` on the manager does
        let output = Command::new(&self.systemctl)
            .arg("show")
            .arg("--property=Version")
            .output()
            .map_err(|e| Error::Connect(format!("Failed to execute {}: {}", self.systemctl, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Connect(format!(
                "service manager unreachable: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(
            "Connected to systemd {}",
            SystemdControl::property(&stdout, "Version").unwrap_or_default()
        );

        Ok(Box::new(SystemdSession {
            systemctl: self.systemctl.clone(),
        }))
    }
}

struct SystemdSession {
    systemctl: String,
}

impl SystemdSession {
    fn show(&self, unit: &str, property: &str) -> std::io::Result<Output> {
        Command::new(&self.systemctl)
            .arg("show")
            .arg(unit)
            .arg(format!("--property={}", property))
            .output()
    }
}

impl ControlSession for SystemdSession {
    fn open<'a>(&'a self, name: &str) -> Result<Box<dyn ServiceHandle + 'a>> {
        let output = self
            .show(name, "LoadState")
            .map_err(|e| Error::Query(format!("Failed to open {}: {}", name, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Query(format!("show {} failed: {}", name, stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match SystemdControl::property(&stdout, "LoadState").as_deref() {
            Some("not-found") => Err(Error::NotFound(name.to_string())),
            Some(state) => {
                debug!("Opened {} (LoadState={})", name, state);
                Ok(Box::new(SystemdHandle {
                    session: self,
                    name: name.to_string(),
                }))
            }
            None => Err(Error::Query(format!("no LoadState reported for {}", name))),
        }
    }
}

struct SystemdHandle<'a> {
    session: &'a SystemdSession,
    name: String,
}

impl ServiceHandle for SystemdHandle<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self) -> Result<RawState> {
        let output = self
            .session
            .show(&self.name, "ActiveState")
            .map_err(|e| Error::Query(format!("Failed to query {}: {}", self.name, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Query(format!("show {} failed: {}", self.name, stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let active_state = SystemdControl::property(&stdout, "ActiveState")
            .ok_or_else(|| Error::Query(format!("no ActiveState reported for {}", self.name)))?;

        Ok(SystemdControl::raw_state_for(&active_state))
    }

    fn start(&self) -> Result<()> {
        let output = Command::new(&self.session.systemctl)
            .arg("start")
            .arg("--no-block")
            .arg(&self.name)
            .output()
            .map_err(|e| Error::Start(format!("Failed to execute start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Start(format!("start {} failed: {}", self.name, stderr.trim())));
        }

        Ok(())
    }
}
