//! ShutdownActor - Ends the group when the process is signalled
//!
//! The actor finishes with [`Error::Signal`] when a signal arrives, which the
//! group treats like any other first finisher: everyone else is interrupted.

use std::future::Future;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use super::{Actor, Cancellation};
use crate::{Error, Result};

pub struct ShutdownActor {
    /// Resolves with the signal's name; taken by the first `execute`
    signal: Mutex<Option<BoxFuture<'static, String>>>,
    cancel: Cancellation,
}

impl ShutdownActor {
    pub fn new(signal: impl Future<Output = String> + Send + 'static) -> Self {
        Self {
            signal: Mutex::new(Some(signal.boxed())),
            cancel: Cancellation::new(),
        }
    }

    /// Waits for SIGINT or SIGTERM
    #[cfg(unix)]
    pub fn from_os_signals() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;

        Ok(Self::new(async move {
            tokio::select! {
                _ = interrupt.recv() => "interrupt".to_string(),
                _ = terminate.recv() => "terminated".to_string(),
            }
        }))
    }

    /// Waits for Ctrl-C
    #[cfg(not(unix))]
    pub fn from_os_signals() -> std::io::Result<Self> {
        Ok(Self::new(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => "interrupt".to_string(),
                Err(_) => std::future::pending().await,
            }
        }))
    }
}

#[async_trait]
impl Actor for ShutdownActor {
    fn name(&self) -> &'static str {
        "shutdown signal handler"
    }

    #[instrument(skip(self), name = "shutdown")]
    async fn execute(&self) -> Result<()> {
        let Some(signal) = self.signal.lock().await.take() else {
            return Ok(());
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!("asked to terminate");
                Ok(())
            }
            name = signal => {
                info!("received signal {name}");
                Err(Error::Signal(name))
            }
        }
    }

    fn interrupt(&self, cause: Option<&Error>) {
        info!("shutdown handler interrupted with {cause:?}");
        self.cancel.cancel();
    }
}
