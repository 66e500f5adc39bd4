//! Provider usage metrics

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::api_usage::UsageSummary;
use crate::error::ApiResult;
use crate::services::usage::{self, DEFAULT_SUMMARY_HOURS};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UsageQuery {
    pub hours: Option<i64>,
}

/// GET /metrics/api-usage?hours=
///
/// Per-endpoint call counts, error counts and average latency over the
/// window (default 24 hours).
pub async fn api_usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<Json<UsageSummary>> {
    let hours = query.hours.unwrap_or(DEFAULT_SUMMARY_HOURS);
    Ok(Json(usage::summarize(&state.db, hours).await?))
}

pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/metrics/api-usage", get(api_usage))
}
