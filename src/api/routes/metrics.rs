//! Prometheus scrape endpoint

use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};

use crate::api::{error::ApiResult, state::ApiState};

/// GET /metrics
///
/// Encodes the collector's current gauges in the text exposition format
pub async fn get_metrics(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let families = state.collector.collect().await?;

    let mut buffer = vec![];
    TextEncoder::new().encode(&families, &mut buffer)?;

    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], buffer))
}
