//! Last-known VPN state, shared with viewers

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::Snapshot;

/// Source of the current instant, injected so tests can pin time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UtcClock;

impl Clock for UtcClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Can record a new VPN state
#[async_trait]
pub trait StateUpdater: Send + Sync {
    async fn update(&self, snapshot: Snapshot, timestamp: DateTime<Utc>);
}

/// The last snapshot applied and when it was applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    pub snapshot: Snapshot,

    /// `None` until the first update arrives
    pub timestamp: Option<DateTime<Utc>>,
}

/// Shared handle to the last-known [`State`]
///
/// Written by the state monitor only, read by any number of viewers. Last write wins.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<State>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn latest(&self) -> State {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl StateUpdater for SharedState {
    async fn update(&self, snapshot: Snapshot, timestamp: DateTime<Utc>) {
        let mut state = self.inner.write().await;
        state.snapshot = snapshot;
        state.timestamp = Some(timestamp);
    }
}
