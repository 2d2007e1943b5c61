//! Last-known VPN state endpoint

use axum::{Json, extract::State};

use crate::api::{state::ApiState, types::StateResponse};

/// GET /api/v1/state
pub async fn get_state(State(state): State<ApiState>) -> Json<StateResponse> {
    let latest = state.state.latest().await;
    Json(StateResponse::from(&latest))
}
