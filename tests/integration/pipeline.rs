//! End-to-end tests of the full actor pipeline
//!
//! These tests verify that:
//! - A polled snapshot reaches both the gauges and the last-known state
//! - A shutdown signal unwinds every actor
//! - A failing source ends the group with its error

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use prometheus::Registry;
use tokio::sync::{mpsc, oneshot};
use vpncheck::{
    Error, Result, Snapshot, TunnelStatus,
    actors::{
        collector::{CollectorHandle, GaugeCollector},
        group::Group,
        monitor::StateMonitor,
        poller::Poller,
        shutdown::ShutdownActor,
        updater::UpdaterStage,
    },
    metrics::PrometheusSink,
    source::TelemetrySource,
    state::{SharedState, StateUpdater},
};

use crate::helpers::{FixedClock, StateWaiter, StubSource, fixed_time, gauge_values, snapshot};

struct Pipeline {
    group: Group,
    collector: CollectorHandle,
    signal: oneshot::Sender<String>,
}

/// Wires every actor the way the binary does, with test doubles at the edges
fn pipeline(source: Arc<dyn TelemetrySource>, state: Arc<dyn StateUpdater>) -> Pipeline {
    let registry = Registry::new();
    let sink = PrometheusSink::tunnel_up(&registry).unwrap();
    let (collector, collector_handle) = GaugeCollector::new(Arc::new(sink));

    let (status_tx, status_rx) = mpsc::channel(1);
    let (vpn_updates_tx, vpn_updates_rx) = mpsc::channel(1);
    let (signal_tx, signal_rx) = oneshot::channel::<String>();

    let mut group = Group::new();
    group
        .add(ShutdownActor::new(async move {
            signal_rx.await.unwrap_or_default()
        }))
        .add(collector)
        .add(StateMonitor::new(
            Arc::new(FixedClock(fixed_time())),
            state,
            vpn_updates_rx,
        ))
        .add(UpdaterStage::new(
            Arc::new(collector_handle.clone()),
            status_rx,
            vpn_updates_tx,
        ))
        .add(Poller::new(source, status_tx, Duration::from_secs(3600)));

    Pipeline {
        group,
        collector: collector_handle,
        signal: signal_tx,
    }
}

#[tokio::test]
async fn test_snapshot_reaches_gauges_and_state() {
    let state = SharedState::new();
    let waiter = StateWaiter::new(state.clone());
    let source = StubSource::returning(Ok(snapshot(&[("gw1", &[("1.2.3.4", TunnelStatus::Up)])])));

    let Pipeline {
        group,
        collector,
        signal,
    } = pipeline(source, waiter.clone());
    let running = tokio::spawn(group.run());

    tokio::time::timeout(Duration::from_secs(1), waiter.updated.notified())
        .await
        .expect("state was never updated");

    let gauges = gauge_values(&collector.collect().await.unwrap());
    assert_eq!(gauges.len(), 1);
    assert_eq!(
        gauges.get(&("gw1".to_string(), "1.2.3.4".to_string())),
        Some(&1.0)
    );

    let latest = state.latest().await;
    assert_eq!(latest.snapshot.connections().len(), 1);
    assert_eq!(latest.snapshot.connections()[0].vpn_gateway_id, "gw1");
    assert_eq!(latest.timestamp, Some(fixed_time()));

    signal.send("interrupt".to_string()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), running)
        .await
        .expect("group didn't stop after the signal")
        .unwrap();
    assert_eq!(result, Err(Error::Signal("interrupt".to_string())));

    // The collector went down with the group.
    assert_eq!(collector.collect().await, Err(Error::CollectorStopped));
}

#[tokio::test]
async fn test_source_failure_ends_the_group() {
    let expected = Error::Source("connection refused".to_string());
    let source = StubSource::returning(Err(expected.clone()));

    let Pipeline { group, signal, .. } = pipeline(source.clone(), Arc::new(SharedState::new()));

    let result: Result<()> = tokio::time::timeout(Duration::from_secs(1), group.run())
        .await
        .expect("group didn't stop after the source failed");

    assert_eq!(result, Err(expected));
    assert_eq!(source.calls(), 1);
    drop(signal);
}

#[tokio::test]
async fn test_empty_poll_leaves_no_gauges() {
    let state = SharedState::new();
    let waiter = StateWaiter::new(state.clone());
    let source = StubSource::returning(Ok(Snapshot::default()));

    let Pipeline {
        group,
        collector,
        signal,
    } = pipeline(source, waiter.clone());
    let running = tokio::spawn(group.run());

    tokio::time::timeout(Duration::from_secs(1), waiter.updated.notified())
        .await
        .expect("state was never updated");

    assert!(collector.collect().await.unwrap().is_empty());
    assert_eq!(state.latest().await.timestamp, Some(fixed_time()));

    signal.send("terminated".to_string()).unwrap();
    let _ = running.await;
}
