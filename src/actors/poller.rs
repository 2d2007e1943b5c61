//! Poller - Source stage fetching VPN telemetry on an interval
//!
//! ## Message Flow
//!
//! ```text
//! start → query source → send snapshot → wait one tick → query source → ...
//!              │                                  ↑
//!              └── error: return it (fail fast)   └── interrupt: return Ok
//! ```
//!
//! A failing source is not retried. The error ends the poller, which ends the
//! whole group; restarting is left to whatever supervises the process.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, instrument};

use super::{Actor, Cancellation};
use crate::source::TelemetrySource;
use crate::{Error, Result, Snapshot};

pub struct Poller {
    source: Arc<dyn TelemetrySource>,
    status_tx: mpsc::Sender<Snapshot>,
    interval: Duration,
    cancel: Cancellation,
}

impl Poller {
    /// `interval` must be non-zero.
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        status_tx: mpsc::Sender<Snapshot>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            status_tx,
            interval,
            cancel: Cancellation::new(),
        }
    }
}

#[async_trait]
impl Actor for Poller {
    fn name(&self) -> &'static str {
        "poller"
    }

    #[instrument(skip(self), name = "poller", fields(interval = ?self.interval))]
    async fn execute(&self) -> Result<()> {
        let cancelled = self.cancel.cancelled();
        tokio::pin!(cancelled);

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let snapshot = tokio::select! {
                biased;
                _ = &mut cancelled => break,
                result = self.source.describe_connections() => result?,
            };

            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                sent = self.status_tx.send(snapshot) => {
                    sent.map_err(|_| Error::ChannelClosed("poller output"))?;
                    debug!("sent updated VPN telemetry data to next stage");
                }
            }

            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                _ = ticker.tick() => debug!("waking up"),
            }
        }

        info!("asked to terminate");
        Ok(())
    }

    fn interrupt(&self, cause: Option<&Error>) {
        info!("poller interrupted with {cause:?}");
        self.cancel.cancel();
    }
}
