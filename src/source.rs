//! Telemetry sources the poller can query
//!
//! [`HttpTelemetrySource`] fetches a `DescribeVpnConnections`-shaped JSON
//! document from an HTTP endpoint:
//!
//! ```json
//! {"VpnConnections": [{"VpnGatewayId": "vgw-1", "VgwTelemetry": [{"OutsideIpAddress": "1.2.3.4", "Status": "UP"}]}]}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, trace, warn};

use crate::config::SourceConfig;
use crate::{Connection, Error, Result, Snapshot};

/// Where snapshots come from
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// The current state of every VPN connection
    async fn describe_connections(&self) -> Result<Snapshot>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVpnConnectionsOutput {
    #[serde(default)]
    vpn_connections: Vec<Connection>,
}

/// Polls an HTTP endpoint for VPN telemetry
pub struct HttpTelemetrySource {
    url: String,
    token: Option<String>,

    /// HTTP client (reused across requests)
    client: reqwest::Client,
}

impl HttpTelemetrySource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        if config.insecure {
            warn!("TLS certificate verification disabled for {}", config.url);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| Error::Source(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: config.url.clone(),
            token: config.token.clone(),
            client,
        })
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn describe_connections(&self) -> Result<Snapshot> {
        trace!("requesting VPN telemetry");

        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Source(format!("failed to send HTTP request: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Source(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Source(format!("failed to read response body: {e}")))?;

        let output: DescribeVpnConnectionsOutput = serde_json::from_str(&body)
            .map_err(|e| Error::Source(format!("failed to parse telemetry JSON: {e}")))?;

        trace!("received {} connections", output.vpn_connections.len());

        Ok(Snapshot::new(output.vpn_connections))
    }
}
