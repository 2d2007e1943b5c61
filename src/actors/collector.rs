//! GaugeCollector - Publishes one `cc_vpn_tunnel_up` gauge per tunnel
//!
//! Tunnels come and go between polls, so the set of gauges has to follow them:
//! a gauge is registered the first time a tunnel shows up, updated in place
//! while it keeps showing up, and unregistered once a snapshot no longer
//! contains it.
//!
//! ## Ownership
//!
//! The gauge registry lives inside the collector's `execute` loop and nowhere
//! else. Snapshot updates and scrapes both arrive as [`CollectorRequest`]s on one
//! queue and are handled one at a time, so a scrape observes the registry either
//! entirely before or entirely after any given update. There is no lock.
//!
//! ## Message Flow
//!
//! ```text
//! Updater ── apply(snapshot) ──┐
//!                              ├──▶ request queue ──▶ GaugeRegistry ──▶ GaugeSink
//! /metrics ── collect() ───────┘                            │
//!     ▲                                                     │
//!     └──────────────── Vec<MetricFamily> ◀─────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use prometheus::Gauge;
use prometheus::proto::MetricFamily;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, instrument, trace, warn};

use super::messages::CollectorRequest;
use super::updater::Updater;
use super::{Actor, Cancellation};
use crate::metrics::{GaugeSink, Labels, TUNNEL_UP, gauge_id, tunnel_labels};
use crate::{Error, Result, Snapshot, Tunnel};

/// Requests that may queue up before the collector gets to them
const REQUEST_BUFFER: usize = 32;

/// A registered gauge for one tunnel, plus the means to unregister it
struct TunnelGauge {
    labels: Labels,
    gauge: Gauge,
    unregister: Box<dyn FnOnce() + Send>,
}

impl TunnelGauge {
    fn update_from(&self, tunnel: &Tunnel) {
        self.gauge.set(tunnel.status.as_gauge_value());
    }

    fn retire(self) {
        (self.unregister)();
    }
}

/// The per-tunnel gauges currently published
///
/// Invariant: after [`apply`](Self::apply) returns, the registry holds exactly one
/// entry per tunnel identity (gateway id, outside IP) of the applied snapshot.
pub struct GaugeRegistry {
    sink: Arc<dyn GaugeSink>,
    gauges: HashMap<String, TunnelGauge>,
}

impl GaugeRegistry {
    pub fn new(sink: Arc<dyn GaugeSink>) -> Self {
        Self {
            sink,
            gauges: HashMap::new(),
        }
    }

    /// Brings the registry in line with `snapshot`
    ///
    /// Gauges for tunnels seen before are updated in place, gauges for new
    /// tunnels are registered, and gauges for tunnels that disappeared are
    /// unregistered.
    pub fn apply(&mut self, snapshot: &Snapshot) {
        let mut keep = HashMap::with_capacity(self.gauges.len());

        for (connection, tunnel) in snapshot.tunnels() {
            let labels = tunnel_labels(&connection.vpn_gateway_id, &tunnel.outside_ip);
            let id = gauge_id(TUNNEL_UP, &labels);

            // A tunnel listed twice in one snapshot reuses the entry from earlier in this pass.
            if let Some(existing) = self.gauges.remove(&id).or_else(|| keep.remove(&id)) {
                trace!("updating existing gauge {:?}", existing.labels);
                existing.update_from(tunnel);
                keep.insert(id, existing);
                continue;
            }

            match self.register(labels) {
                Ok(gauge) => {
                    gauge.update_from(tunnel);
                    keep.insert(id, gauge);
                }
                Err(e) => warn!("skipping gauge {id}: {e}"),
            }
        }

        for (id, redundant) in self.gauges.drain() {
            debug!("removing redundant gauge {id}");
            redundant.retire();
        }

        self.gauges = keep;
    }

    fn register(&self, labels: Labels) -> Result<TunnelGauge> {
        debug!("adding gauge for new tunnel {labels:?}");

        let gauge = self.sink.gauge(&labels)?;
        let sink = Arc::clone(&self.sink);
        let unregister_labels = labels.clone();

        Ok(TunnelGauge {
            labels,
            gauge,
            unregister: Box::new(move || {
                if let Err(e) = sink.remove(&unregister_labels) {
                    warn!("failed to unregister gauge {unregister_labels:?}: {e}");
                }
            }),
        })
    }

    /// Current value of every registered gauge
    pub fn collect(&self) -> Vec<MetricFamily> {
        self.sink.collect()
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.gauges.contains_key(id)
    }

    /// Registry keys, in no particular order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.gauges.keys().map(String::as_str)
    }
}

/// Actor owning the [`GaugeRegistry`]
///
/// Created together with its [`CollectorHandle`]; the actor goes into a
/// [`Group`](super::group::Group), the handle goes to whoever updates or scrapes.
pub struct GaugeCollector {
    sink: Arc<dyn GaugeSink>,
    request_rx: Mutex<mpsc::Receiver<CollectorRequest>>,
    cancel: Cancellation,
}

impl GaugeCollector {
    pub fn new(sink: Arc<dyn GaugeSink>) -> (Self, CollectorHandle) {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER);

        let collector = Self {
            sink,
            request_rx: Mutex::new(request_rx),
            cancel: Cancellation::new(),
        };

        (collector, CollectorHandle { sender: request_tx })
    }
}

#[async_trait]
impl Actor for GaugeCollector {
    fn name(&self) -> &'static str {
        "gauge collector"
    }

    /// All logic that touches the gauges happens in here.
    #[instrument(skip(self), name = "gauge_collector")]
    async fn execute(&self) -> Result<()> {
        debug!("started execute loop");

        let mut request_rx = self.request_rx.lock().await;
        let mut registry = GaugeRegistry::new(Arc::clone(&self.sink));
        let cancelled = self.cancel.cancelled();
        tokio::pin!(cancelled);

        loop {
            tokio::select! {
                biased;

                _ = &mut cancelled => {
                    info!("received cancellation - exiting loop");
                    break;
                }

                request = request_rx.recv() => match request {
                    Some(CollectorRequest::Apply(snapshot)) => {
                        debug!("received new VPN status");
                        registry.apply(&snapshot);
                    }

                    Some(CollectorRequest::Collect { respond_to }) => {
                        debug!("sending metrics to collector");
                        let _ = respond_to.send(registry.collect());
                    }

                    None => {
                        warn!("all collector handles dropped, shutting down");
                        break;
                    }
                },
            }
        }

        // Fail whatever is still queued, and anything sent later, instead of leaving callers hanging.
        request_rx.close();
        while request_rx.try_recv().is_ok() {}

        Ok(())
    }

    /// Once called the collector cannot be re-used.
    fn interrupt(&self, cause: Option<&Error>) {
        info!("gauge collector interrupted with {cause:?}");
        self.cancel.cancel();
    }
}

/// Handle for talking to a [`GaugeCollector`]
///
/// Cheap to clone and share across tasks.
#[derive(Clone)]
pub struct CollectorHandle {
    sender: mpsc::Sender<CollectorRequest>,
}

impl CollectorHandle {
    /// Queue a snapshot for the collector to apply
    ///
    /// Returns once the request is queued; the collector applies it before
    /// anything queued afterwards.
    pub async fn apply(&self, snapshot: Snapshot) -> Result<()> {
        self.sender
            .send(CollectorRequest::Apply(snapshot))
            .await
            .map_err(|_| Error::CollectorStopped)
    }

    /// Gather the current value of every registered gauge
    ///
    /// Waits until the collector has serviced the request.
    pub async fn collect(&self) -> Result<Vec<MetricFamily>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CollectorRequest::Collect { respond_to: tx })
            .await
            .map_err(|_| Error::CollectorStopped)?;

        rx.await.map_err(|_| Error::CollectorStopped)
    }
}

#[async_trait]
impl Updater for CollectorHandle {
    async fn update(&self, snapshot: Snapshot) -> Result<()> {
        self.apply(snapshot).await
    }
}
