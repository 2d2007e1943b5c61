//! Actor-based polling pipeline
//!
//! Every component of the system runs as an [`Actor`]: a blocking `execute`
//! paired with an `interrupt` that makes `execute` return. Actors are composed
//! into a [`Group`](group::Group); when any one of them returns, every other one
//! is interrupted and the group unwinds.
//!
//! ## Pipeline
//!
//! ```text
//!   Poller ──snapshot──▶ Updater ──snapshot──▶ StateMonitor ──▶ SharedState
//!                           │
//!                           └── apply ──▶ GaugeCollector ◀── collect ── /metrics
//! ```
//!
//! - **Poller**: queries the telemetry source now and then on every tick
//! - **Updater**: applies each snapshot to the gauge collector, then forwards it
//! - **GaugeCollector**: owns the per-tunnel gauges, serves scrapes
//! - **StateMonitor**: records the last snapshot and when it arrived
//! - **ShutdownActor**: finishes when SIGINT/SIGTERM arrives
//!
//! ## Communication Patterns
//!
//! 1. **Stages**: capacity-1 mpsc channels, so a stage holds at most one snapshot in flight
//! 2. **Requests**: the collector serves apply/collect from one mpsc queue, in arrival order
//! 3. **Request/Response**: oneshot channels for scrapes

use std::future::Future;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{Error, Result};

pub mod collector;
pub mod group;
pub mod messages;
pub mod monitor;
pub mod poller;
pub mod shutdown;
pub mod updater;

/// A unit of concurrent work
///
/// `execute` runs until the work completes, fails, or `interrupt` is called from
/// another task. After `interrupt`, every await point inside `execute` must
/// resolve promptly. `interrupt` is called at most once per instance.
#[async_trait]
pub trait Actor: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    async fn execute(&self) -> Result<()>;

    /// Asks `execute` to return. `cause` is the error that ended the group, if any.
    fn interrupt(&self, cause: Option<&Error>);
}

/// Private cancellation signal of one actor
///
/// Cancelling before anyone waits is fine: waiters check the current value first.
#[derive(Debug)]
pub struct Cancellation {
    tx: watch::Sender<bool>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    ///
    /// The returned future owns its subscription, so it can be handed to
    /// `'static` consumers such as a server's graceful shutdown hook.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // Err means the sender is gone, which only happens when the actor is dropped.
            let _ = rx.wait_for(|cancelled| *cancelled).await;
        }
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
