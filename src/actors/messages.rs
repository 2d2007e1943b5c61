//! Message types for actor communication
//!
//! Pipeline stages pass [`Snapshot`]s to each other directly over mpsc
//! channels. The gauge collector is the only actor with a request protocol,
//! defined here.

use prometheus::proto::MetricFamily;
use tokio::sync::oneshot;

use crate::Snapshot;

/// Requests served by the [`GaugeCollector`](super::collector::GaugeCollector)
///
/// All requests travel through one queue, so they are handled strictly in the
/// order they were sent: a scrape queued after an apply always sees its result.
#[derive(Debug)]
pub enum CollectorRequest {
    /// Recompute the gauges from a new snapshot
    Apply(Snapshot),

    /// Gather the current value of every registered gauge
    Collect {
        /// Channel to send the gathered families back
        respond_to: oneshot::Sender<Vec<MetricFamily>>,
    },
}
