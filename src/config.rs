use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use tracing::trace;

const DEFAULT_PORT: u16 = 8080;

/// One week
const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// One hour
const MAX_TIMEOUT_SECS: u64 = 60 * 60;

/// Environment variable that can supply the source token instead of the config file
pub const SOURCE_TOKEN: &str = "VPNCHECK_SOURCE_TOKEN";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub source: SourceConfig,

    /// Seconds between two polls of the telemetry source
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Address the HTTP server listens on
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Fills in the source token from `env_token` when the file has none
    pub fn with_env_token(mut self, env_token: Option<String>) -> Self {
        if self.source.token.is_none() {
            self.source.token = env_token;
        }
        self
    }
}

pub fn get_source_token() -> Option<String> {
    std::env::var(SOURCE_TOKEN).ok()
}

/// Where VPN telemetry is fetched from
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SourceConfig {
    pub url: String,

    /// Sent as a bearer token when present
    pub token: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Accept invalid TLS certificates from the source
    #[serde(default)]
    pub insecure: bool,
}

fn default_interval() -> u64 {
    300
}

fn default_timeout() -> u64 {
    30
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

pub fn parse_config(content: &str) -> anyhow::Result<Config> {
    let config: Config =
        serde_json::from_str(content).context("Invalid configuration file provided!")?;

    anyhow::ensure!(
        (1..=MAX_INTERVAL_SECS).contains(&config.interval_secs),
        "interval_secs must be between 1 and {MAX_INTERVAL_SECS}"
    );
    anyhow::ensure!(
        (1..=MAX_TIMEOUT_SECS).contains(&config.source.timeout_secs),
        "source.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}"
    );

    Ok(config)
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    parse_config(&file_content).inspect(|config| trace!("loaded config: {config:?}"))
}
