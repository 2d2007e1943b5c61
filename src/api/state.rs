//! Shared state passed to all API handlers

use crate::actors::collector::CollectorHandle;
use crate::state::SharedState;

#[derive(Clone)]
pub struct ApiState {
    /// Handle to the gauge collector, for scrapes
    pub collector: CollectorHandle,

    /// Last-known VPN state
    pub state: SharedState,
}

impl ApiState {
    pub fn new(collector: CollectorHandle, state: SharedState) -> Self {
        Self { collector, state }
    }
}
