//! Group - runs actors together and unwinds them together
//!
//! ## Lifecycle
//!
//! ```text
//! add(a), add(b), add(c) → run() → spawn a, b, c
//!                                   first to return (say b) ──▶ interrupt(a), interrupt(c)
//!                                   wait for a and c ──▶ return b's result
//! ```
//!
//! An OS signal is just another actor in the group, so Ctrl-C unwinds the
//! pipeline exactly like a failing stage does.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::Actor;
use crate::{Error, Result};

/// A set of actors started together and stopped together
#[derive(Default)]
pub struct Group {
    actors: Vec<Arc<dyn Actor>>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor. Must happen before [`run`](Self::run).
    pub fn add(&mut self, actor: impl Actor) -> &mut Self {
        self.actors.push(Arc::new(actor));
        self
    }

    /// Run every actor concurrently until the first one returns
    ///
    /// The remaining actors are interrupted with the first result's error (or
    /// `None` when it returned `Ok`), and this waits for all of them before
    /// returning that first result. A panicking actor counts as a failure and
    /// is not interrupted itself.
    #[instrument(skip(self), fields(actors = self.actors.len()))]
    pub async fn run(self) -> Result<()> {
        if self.actors.is_empty() {
            return Ok(());
        }

        let mut tasks = JoinSet::new();
        let mut task_ids = HashMap::with_capacity(self.actors.len());
        for (index, actor) in self.actors.iter().enumerate() {
            let actor = Arc::clone(actor);
            debug!("starting actor {}", actor.name());
            let handle = tasks.spawn(async move { (index, actor.execute().await) });
            task_ids.insert(handle.id(), index);
        }

        let (finished, result) = match tasks.join_next().await {
            Some(Ok((index, result))) => (Some(index), result),
            Some(Err(e)) => (task_ids.get(&e.id()).copied(), Err(Error::Panicked(e.to_string()))),
            None => return Ok(()),
        };

        let name = |index: usize| self.actors[index].name();
        match (finished, &result) {
            (Some(index), Ok(())) => info!("actor {} finished, interrupting the group", name(index)),
            (Some(index), Err(Error::Panicked(e))) => {
                warn!("actor {} panicked: {e}, interrupting the group", name(index))
            }
            (Some(index), Err(e)) => {
                info!("actor {} failed: {e}, interrupting the group", name(index))
            }
            (None, Err(e)) => warn!("{e}, interrupting the group"),
            (None, Ok(())) => {}
        }

        let cause = result.as_ref().err();
        for (index, actor) in self.actors.iter().enumerate() {
            if finished != Some(index) {
                actor.interrupt(cause);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(()))) => debug!("actor {} stopped", self.actors[index].name()),
                Ok((index, Err(e))) => {
                    debug!("actor {} stopped with: {e}", self.actors[index].name())
                }
                Err(e) => match task_ids.get(&e.id()) {
                    Some(index) => warn!("actor {} panicked while shutting down: {e}", name(*index)),
                    None => warn!("actor panicked while shutting down: {e}"),
                },
            }
        }

        result
    }
}
