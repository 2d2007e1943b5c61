//! API response types

use serde::{Deserialize, Serialize};

use crate::state::State;
use crate::{Connection, Tunnel, TunnelStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    /// Time of the last state update, if any
    pub last_update: Option<String>,
}

/// Body of `GET /api/v1/state`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateResponse {
    /// RFC 3339 time of the last update, `None` before the first poll lands
    pub timestamp: Option<String>,
    pub connections: Vec<ConnectionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionView {
    pub vpn_gateway_id: String,
    pub vpn_connection_id: Option<String>,
    /// From the connection's `Name` tag, empty when untagged
    pub name: String,
    pub state: Option<String>,
    pub tunnels: Vec<TunnelView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TunnelView {
    pub outside_ip: String,
    pub status: TunnelStatus,
    pub status_message: Option<String>,
    pub last_status_change: Option<String>,
}

impl From<&State> for StateResponse {
    fn from(state: &State) -> Self {
        Self {
            timestamp: state.timestamp.map(|t| t.to_rfc3339()),
            connections: state
                .snapshot
                .connections()
                .iter()
                .map(ConnectionView::from)
                .collect(),
        }
    }
}

impl From<&Connection> for ConnectionView {
    fn from(connection: &Connection) -> Self {
        Self {
            vpn_gateway_id: connection.vpn_gateway_id.clone(),
            vpn_connection_id: connection.vpn_connection_id.clone(),
            name: connection.name().to_string(),
            state: connection.state.clone(),
            tunnels: connection.telemetry.iter().map(TunnelView::from).collect(),
        }
    }
}

impl From<&Tunnel> for TunnelView {
    fn from(tunnel: &Tunnel) -> Self {
        Self {
            outside_ip: tunnel.outside_ip.clone(),
            status: tunnel.status,
            status_message: tunnel.status_message.clone(),
            last_status_change: tunnel.last_status_change.map(|t| t.to_rfc3339()),
        }
    }
}
