//! Integration tests for the HTTP endpoints
//!
//! These tests verify that:
//! - `/metrics` exposes one gauge per tunnel in the text format
//! - `/api/v1/state` reports the last-known state
//! - A stopped collector turns scrapes into 503s
//! - The server stops when interrupted

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use prometheus::Registry;
use serde_json::Value;
use vpncheck::{
    TunnelStatus,
    actors::{
        Actor,
        collector::{CollectorHandle, GaugeCollector},
    },
    api::{ApiServer, ApiState, HealthResponse, StateResponse},
    metrics::PrometheusSink,
    state::{SharedState, StateUpdater},
};

use crate::helpers::{fixed_time, snapshot};

struct TestApi {
    addr: SocketAddr,
    server: Arc<ApiServer>,
    collector: Arc<GaugeCollector>,
    handle: CollectorHandle,
    state: SharedState,
}

// Helper to create test API server
async fn spawn_test_api() -> TestApi {
    let registry = Registry::new();
    let sink = PrometheusSink::tunnel_up(&registry).unwrap();
    let (collector, handle) = GaugeCollector::new(Arc::new(sink));
    let collector = Arc::new(collector);
    let state = SharedState::new();

    let server = ApiServer::bind(
        "127.0.0.1:0".parse().unwrap(), // Random port
        ApiState::new(handle.clone(), state.clone()),
    )
    .await
    .unwrap();
    let server = Arc::new(server);

    let running = Arc::clone(&collector);
    tokio::spawn(async move { running.execute().await });
    let running = Arc::clone(&server);
    tokio::spawn(async move { running.execute().await });

    TestApi {
        addr: server.local_addr(),
        server,
        collector,
        handle,
        state,
    }
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let api = spawn_test_api().await;
    api.handle
        .apply(snapshot(&[(
            "gw1",
            &[("1.2.3.4", TunnelStatus::Up), ("5.6.7.8", TunnelStatus::Down)],
        )]))
        .await
        .unwrap();

    let response = reqwest::get(format!("http://{}/metrics", api.addr))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        prometheus::TEXT_FORMAT
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("# TYPE cc_vpn_tunnel_up gauge"), "{body}");
    assert!(
        body.contains(r#"cc_vpn_tunnel_up{outside_ip="1.2.3.4",vpn_id="gw1"} 1"#),
        "{body}"
    );
    assert!(
        body.contains(r#"cc_vpn_tunnel_up{outside_ip="5.6.7.8",vpn_id="gw1"} 0"#),
        "{body}"
    );
}

#[tokio::test]
async fn test_metrics_endpoint_without_tunnels() {
    let api = spawn_test_api().await;

    let response = reqwest::get(format!("http://{}/metrics", api.addr))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.text().await.unwrap().contains("cc_vpn_tunnel_up"));
}

#[tokio::test]
async fn test_metrics_endpoint_after_collector_stopped() {
    let api = spawn_test_api().await;

    api.collector.interrupt(None);
    // Wait until the collector has actually closed its queue.
    tokio::time::timeout(Duration::from_secs(1), async {
        while api.handle.collect().await.is_ok() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("collector never stopped");

    let response = reqwest::get(format!("http://{}/metrics", api.addr))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = response.json().await.unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_state_endpoint() {
    let api = spawn_test_api().await;

    let response = reqwest::get(format!("http://{}/api/v1/state", api.addr))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let empty: StateResponse = response.json().await.unwrap();
    assert_eq!(empty.timestamp, None);
    assert!(empty.connections.is_empty());

    api.state
        .update(
            snapshot(&[("gw1", &[("1.2.3.4", TunnelStatus::Up)])]),
            fixed_time(),
        )
        .await;

    let state: StateResponse = reqwest::get(format!("http://{}/api/v1/state", api.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(state.timestamp.as_deref(), Some("2009-11-17T20:34:58+00:00"));
    assert_eq!(state.connections.len(), 1);
    assert_eq!(state.connections[0].vpn_gateway_id, "gw1");
    assert_eq!(state.connections[0].tunnels[0].outside_ip, "1.2.3.4");
    assert_eq!(state.connections[0].tunnels[0].status, TunnelStatus::Up);
}

#[tokio::test]
async fn test_health_endpoint() {
    let api = spawn_test_api().await;

    let health: HealthResponse = reqwest::get(format!("http://{}/api/v1/health", api.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.last_update, None);
}

#[tokio::test]
async fn test_server_stops_when_interrupted() {
    let registry = Registry::new();
    let sink = PrometheusSink::tunnel_up(&registry).unwrap();
    let (_collector, handle) = GaugeCollector::new(Arc::new(sink));
    let server = Arc::new(
        ApiServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            ApiState::new(handle, SharedState::new()),
        )
        .await
        .unwrap(),
    );
    let running = Arc::clone(&server);
    let task = tokio::spawn(async move { running.execute().await });

    server.interrupt(None);

    let result = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("server didn't shut down in response to interrupt")
        .unwrap();
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let api = spawn_test_api().await;

    let second = ApiServer::bind(api.addr, ApiState::new(api.handle.clone(), api.state.clone())).await;

    assert!(second.is_err());
    api.server.interrupt(None);
}
