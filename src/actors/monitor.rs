//! StateMonitor - Sink stage recording the last-known state
//!
//! Every snapshot that reaches this stage replaces the shared state, stamped
//! with the injected clock's time.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument};

use super::{Actor, Cancellation};
use crate::state::{Clock, StateUpdater};
use crate::{Error, Result, Snapshot};

pub struct StateMonitor {
    clock: Arc<dyn Clock>,
    state: Arc<dyn StateUpdater>,
    updates: Mutex<mpsc::Receiver<Snapshot>>,
    cancel: Cancellation,
}

impl StateMonitor {
    pub fn new(
        clock: Arc<dyn Clock>,
        state: Arc<dyn StateUpdater>,
        updates: mpsc::Receiver<Snapshot>,
    ) -> Self {
        Self {
            clock,
            state,
            updates: Mutex::new(updates),
            cancel: Cancellation::new(),
        }
    }
}

#[async_trait]
impl Actor for StateMonitor {
    fn name(&self) -> &'static str {
        "monitor state"
    }

    #[instrument(skip(self), name = "monitor_state")]
    async fn execute(&self) -> Result<()> {
        let mut updates = self.updates.lock().await;
        let cancelled = self.cancel.cancelled();
        tokio::pin!(cancelled);

        loop {
            tokio::select! {
                biased;

                _ = &mut cancelled => {
                    info!("asked to terminate");
                    return Ok(());
                }

                update = updates.recv() => match update {
                    Some(snapshot) => {
                        debug!("got update");
                        self.state.update(snapshot, self.clock.now()).await;
                    }
                    None => {
                        debug!("upstream closed");
                        return Ok(());
                    }
                },
            }
        }
    }

    fn interrupt(&self, cause: Option<&Error>) {
        info!("state monitor interrupted with {cause:?}");
        self.cancel.cancel();
    }
}
