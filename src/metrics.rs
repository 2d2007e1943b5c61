//! Metric sink abstraction over the Prometheus client
//!
//! The gauge collector never talks to a global registry. It is handed a
//! [`GaugeSink`] that can register a labelled gauge, unregister it again, and
//! gather everything currently registered. [`PrometheusSink`] is the production
//! implementation, backed by one `GaugeVec` registered in an explicitly
//! constructed [`Registry`].

use std::collections::{BTreeMap, HashMap};

use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts, Registry};

use crate::Result;

pub const NAMESPACE: &str = "cc";
pub const SUBSYSTEM: &str = "vpn";
pub const TUNNEL_UP: &str = "tunnel_up";
pub const TUNNEL_UP_HELP: &str =
    "If the site to site VPN tunnel status is up, partitioned by VPN Connection ID and Outside IP.";

pub const VPN_ID_LABEL: &str = "vpn_id";
pub const OUTSIDE_IP_LABEL: &str = "outside_ip";

/// Label name/value pairs, kept sorted by name.
pub type Labels = BTreeMap<String, String>;

/// Registers, unregisters and gathers labelled gauges for one metric.
pub trait GaugeSink: Send + Sync {
    /// Registers a gauge for `labels` (or returns the one already registered).
    fn gauge(&self, labels: &Labels) -> Result<Gauge>;

    /// Unregisters the gauge for `labels`.
    fn remove(&self, labels: &Labels) -> Result<()>;

    /// Current value of every registered gauge.
    fn collect(&self) -> Vec<MetricFamily>;
}

/// [`GaugeSink`] backed by a Prometheus `GaugeVec`.
#[derive(Clone)]
pub struct PrometheusSink {
    vec: GaugeVec,
}

impl PrometheusSink {
    /// Creates the `cc_vpn_tunnel_up` gauge vector and registers it with `registry`.
    pub fn tunnel_up(registry: &Registry) -> Result<Self> {
        let opts = Opts::new(TUNNEL_UP, TUNNEL_UP_HELP)
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM);
        let vec = GaugeVec::new(opts, &[VPN_ID_LABEL, OUTSIDE_IP_LABEL])?;

        registry.register(Box::new(vec.clone()))?;

        Ok(Self { vec })
    }
}

impl GaugeSink for PrometheusSink {
    fn gauge(&self, labels: &Labels) -> Result<Gauge> {
        Ok(self.vec.get_metric_with(&as_prometheus_labels(labels))?)
    }

    fn remove(&self, labels: &Labels) -> Result<()> {
        Ok(self.vec.remove(&as_prometheus_labels(labels))?)
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.vec
            .collect()
            .into_iter()
            .filter(|family| !family.get_metric().is_empty())
            .collect()
    }
}

fn as_prometheus_labels(labels: &Labels) -> HashMap<&str, &str> {
    labels
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect()
}

/// Labels identifying one tunnel's gauge.
pub fn tunnel_labels(gateway_id: &str, outside_ip: &str) -> Labels {
    Labels::from([
        (VPN_ID_LABEL.to_string(), gateway_id.to_string()),
        (OUTSIDE_IP_LABEL.to_string(), outside_ip.to_string()),
    ])
}

/// Registry key distinguishing a gauge from any other.
///
/// Pairs are rendered `name=value` in name order and joined with `|`. The
/// separators (`\`, `:`, `=`, `|`) are backslash-escaped, so distinct label sets
/// never produce the same key.
pub fn gauge_id(metric_name: &str, labels: &Labels) -> String {
    let pairs: Vec<String> = labels
        .iter()
        .map(|(name, value)| format!("{}={}", escape(name), escape(value)))
        .collect();

    format!("{}:{}", escape(metric_name), pairs.join("|"))
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '=' | '|' | ':') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
