//! Helper functions for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use prometheus::proto::MetricFamily;
use tokio::sync::Notify;
use vpncheck::{
    Connection, Result, Snapshot, Tunnel, TunnelStatus,
    metrics::{OUTSIDE_IP_LABEL, VPN_ID_LABEL},
    source::TelemetrySource,
    state::{Clock, SharedState, StateUpdater},
};

/// 2009-11-17 20:34:58 UTC
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2009, 11, 17, 20, 34, 58).unwrap()
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Builds a snapshot from `(gateway, [(outside ip, status)])` pairs
pub fn snapshot(connections: &[(&str, &[(&str, TunnelStatus)])]) -> Snapshot {
    Snapshot::new(
        connections
            .iter()
            .map(|(gateway, tunnels)| Connection {
                vpn_gateway_id: gateway.to_string(),
                telemetry: tunnels
                    .iter()
                    .map(|(ip, status)| Tunnel::new(*ip, *status))
                    .collect(),
                ..Default::default()
            })
            .collect(),
    )
}

/// Gauge values keyed by `(vpn_id, outside_ip)`
pub fn gauge_values(families: &[MetricFamily]) -> BTreeMap<(String, String), f64> {
    let mut values = BTreeMap::new();
    for family in families {
        for metric in family.get_metric() {
            let label = |name: &str| {
                metric
                    .get_label()
                    .iter()
                    .find(|pair| pair.get_name() == name)
                    .map(|pair| pair.get_value().to_string())
                    .unwrap_or_default()
            };
            values.insert(
                (label(VPN_ID_LABEL), label(OUTSIDE_IP_LABEL)),
                metric.get_gauge().get_value(),
            );
        }
    }
    values
}

/// Always answers with the same result
pub struct StubSource {
    pub result: Result<Snapshot>,
    pub calls: AtomicUsize,
}

impl StubSource {
    pub fn returning(result: Result<Snapshot>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetrySource for StubSource {
    async fn describe_connections(&self) -> Result<Snapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Wraps [`SharedState`] and notifies after every update
pub struct StateWaiter {
    pub state: SharedState,
    pub updated: Notify,
}

impl StateWaiter {
    pub fn new(state: SharedState) -> Arc<Self> {
        Arc::new(Self {
            state,
            updated: Notify::new(),
        })
    }
}

#[async_trait]
impl StateUpdater for StateWaiter {
    async fn update(&self, snapshot: Snapshot, timestamp: DateTime<Utc>) {
        self.state.update(snapshot, timestamp).await;
        self.updated.notify_one();
    }
}
