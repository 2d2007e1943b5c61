//! UpdaterStage - Applies each snapshot, then passes it on
//!
//! ```text
//! Poller ──▶ UpdaterStage ──▶ next stage
//!                 │
//!                 └── updater.update(snapshot)
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument};

use super::{Actor, Cancellation};
use crate::{Error, Result, Snapshot};

/// Something that wants to see every snapshot going down the pipeline
#[async_trait]
pub trait Updater: Send + Sync {
    async fn update(&self, snapshot: Snapshot) -> Result<()>;
}

/// Pipeline stage inserting calls to an [`Updater`]
///
/// Snapshots are forwarded unchanged and in order. With capacity-1 channels on
/// both sides the stage never holds more than one snapshot.
pub struct UpdaterStage {
    updater: Arc<dyn Updater>,
    in_rx: Mutex<mpsc::Receiver<Snapshot>>,
    out_tx: mpsc::Sender<Snapshot>,
    cancel: Cancellation,
}

impl UpdaterStage {
    pub fn new(
        updater: Arc<dyn Updater>,
        in_rx: mpsc::Receiver<Snapshot>,
        out_tx: mpsc::Sender<Snapshot>,
    ) -> Self {
        Self {
            updater,
            in_rx: Mutex::new(in_rx),
            out_tx,
            cancel: Cancellation::new(),
        }
    }
}

#[async_trait]
impl Actor for UpdaterStage {
    fn name(&self) -> &'static str {
        "vpn updater"
    }

    #[instrument(skip(self), name = "vpn_updater")]
    async fn execute(&self) -> Result<()> {
        let mut in_rx = self.in_rx.lock().await;
        let cancelled = self.cancel.cancelled();
        tokio::pin!(cancelled);

        loop {
            let snapshot = tokio::select! {
                biased;
                _ = &mut cancelled => break,
                received = in_rx.recv() => match received {
                    Some(snapshot) => snapshot,
                    None => {
                        debug!("upstream closed");
                        return Ok(());
                    }
                },
            };

            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                result = self.updater.update(snapshot.clone()) => result?,
            }

            tokio::select! {
                biased;
                _ = &mut cancelled => break,
                sent = self.out_tx.send(snapshot) => {
                    sent.map_err(|_| Error::ChannelClosed("updater output"))?;
                    debug!("sent update to next stage");
                }
            }
        }

        info!("asked to shut down");
        Ok(())
    }

    fn interrupt(&self, cause: Option<&Error>) {
        info!("vpn updater interrupted with {cause:?}");
        self.cancel.cancel();
    }
}
