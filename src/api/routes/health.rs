//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/v1/health
///
/// Always "ok" while the server runs; `last_update` tells whether polling has produced anything yet
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let last_update = state.state.latest().await.timestamp;

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        last_update: last_update.map(|t| t.to_rfc3339()),
    })
}
