//! HTTP surface of the poller
//!
//! ## Endpoints
//!
//! - `GET /metrics` - Prometheus text exposition of the tunnel gauges
//! - `GET /api/v1/state` - Last-known VPN state as JSON
//! - `GET /api/v1/health` - Health check
//!
//! The server runs as an [`Actor`] of the pipeline group: it stops gracefully
//! when interrupted, and a listener failure ends the whole group.

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{ConnectionView, HealthResponse, StateResponse, TunnelView};

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::actors::{Actor, Cancellation};
use crate::{Error, Result};

/// Builds the router with every endpoint
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/metrics", get(routes::metrics::get_metrics))
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/state", get(routes::state::get_state))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// HTTP server actor
///
/// Binding happens in [`bind`](Self::bind) so the address is known (and port
/// conflicts reported) before the group starts.
pub struct ApiServer {
    listener: Mutex<Option<TcpListener>>,
    local_addr: SocketAddr,
    state: ApiState,
    cancel: Cancellation,
}

impl ApiServer {
    pub async fn bind(addr: SocketAddr, state: ApiState) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Server(format!("failed to bind {addr}: {e}")))?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener: Mutex::new(Some(listener)),
            local_addr,
            state,
            cancel: Cancellation::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl Actor for ApiServer {
    fn name(&self) -> &'static str {
        "http server"
    }

    #[instrument(skip(self), name = "http_server", fields(addr = %self.local_addr))]
    async fn execute(&self) -> Result<()> {
        let Some(listener) = self.listener.lock().await.take() else {
            return Err(Error::Server("server already started".to_string()));
        };

        info!("API server listening on {}", self.local_addr);

        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(self.cancel.cancelled())
            .await?;

        info!("API server stopped");
        Ok(())
    }

    fn interrupt(&self, cause: Option<&Error>) {
        info!("http server interrupted with {cause:?}");
        self.cancel.cancel();
    }
}
