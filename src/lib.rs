pub mod actors;
#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod source;
pub mod state;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

/// One full poll result: every VPN connection and its tunnels at one instant.
///
/// Snapshots are immutable once produced. Cloning is cheap (the connection list
/// is shared), so a stage can hand the same snapshot to several consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    connections: Arc<[Connection]>,
}

impl Snapshot {
    pub fn new(connections: Vec<Connection>) -> Self {
        Self {
            connections: connections.into(),
        }
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Flattens the snapshot into `(connection, tunnel)` pairs, in order.
    pub fn tunnels(&self) -> impl Iterator<Item = (&Connection, &Tunnel)> {
        self.connections
            .iter()
            .flat_map(|connection| connection.telemetry.iter().map(move |t| (connection, t)))
    }
}

impl From<Vec<Connection>> for Snapshot {
    fn from(connections: Vec<Connection>) -> Self {
        Self::new(connections)
    }
}

/// A site to site VPN connection, as reported by the telemetry source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Connection {
    pub vpn_gateway_id: String,
    #[serde(default)]
    pub vpn_connection_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, rename = "VgwTelemetry")]
    pub telemetry: Vec<Tunnel>,
}

impl Connection {
    /// Value of the connection's `Name` tag (case-insensitive), or "" when untagged.
    pub fn name(&self) -> &str {
        self.tags
            .iter()
            .find(|tag| tag.key.eq_ignore_ascii_case("name"))
            .map(|tag| tag.value.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Telemetry for one tunnel of a connection.
///
/// A tunnel is identified across snapshots by its connection's gateway id and
/// its outside IP address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tunnel {
    #[serde(rename = "OutsideIpAddress")]
    pub outside_ip: String,
    pub status: TunnelStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub last_status_change: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accepted_route_count: Option<u32>,
}

impl Tunnel {
    pub fn new(outside_ip: impl Into<String>, status: TunnelStatus) -> Self {
        Self {
            outside_ip: outside_ip.into(),
            status,
            status_message: None,
            last_status_change: None,
            accepted_route_count: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TunnelStatus {
    Up,
    Down,
    #[serde(other)]
    Unknown,
}

impl TunnelStatus {
    /// Gauge value for this status: only `Up` counts as success.
    pub fn as_gauge_value(self) -> f64 {
        match self {
            TunnelStatus::Up => 1.0,
            TunnelStatus::Down | TunnelStatus::Unknown => 0.0,
        }
    }
}
