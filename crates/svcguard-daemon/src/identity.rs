//! Host identity attached to every report and alert

use crate::config::AgentConfig;
use std::net::UdpSocket;
use svcguard_core::HostIdentity;
use sysinfo::System;
use tracing::warn;

/// Resolve hostname and IP, preferring configured overrides.
/// Detection failures degrade to empty strings.
pub fn resolve(agent: &AgentConfig) -> HostIdentity {
    let hostname = if agent.hostname.is_empty() {
        System::host_name().unwrap_or_else(|| {
            warn!("Could not determine hostname");
            String::new()
        })
    } else {
        agent.hostname.clone()
    };

    let ip = if agent.ip.is_empty() {
        outbound_ip().unwrap_or_else(|e| {
            warn!("Could not determine outbound IP: {}", e);
            String::new()
        })
    } else {
        agent.ip.clone()
    };

    HostIdentity { hostname, ip }
}

/// Local address of the interface that routes to the internet.
/// `connect` on UDP only selects a route; no packet is sent.
pub fn outbound_ip() -> std::io::Result<String> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip().to_string())
}
