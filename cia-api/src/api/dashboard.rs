//! Dashboard snapshot endpoints

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::services::dashboard::{self, DashboardSnapshot, RefreshSummary, DEFAULT_DASHBOARD_LIMIT};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub limit: Option<i64>,
}

/// POST /dashboard/refresh response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub refresh: RefreshSummary,
    pub dashboard: DashboardSnapshot,
}

/// GET /dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<DashboardSnapshot>> {
    let limit = query.limit.unwrap_or(DEFAULT_DASHBOARD_LIMIT);
    Ok(Json(dashboard::load_dashboard(&state.db, limit).await?))
}

/// POST /dashboard/refresh
///
/// Regenerates impact cards for all active watch items, then returns the
/// snapshot. Per-item failures are counted, not fatal.
pub async fn refresh_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<RefreshResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_DASHBOARD_LIMIT);
    let (refresh, snapshot) =
        dashboard::refresh_dashboard(&state.db, &state.orchestrator, limit).await?;

    if refresh.failed > 0 {
        state
            .record_error(format!("Dashboard refresh: {} item(s) failed", refresh.failed))
            .await;
    }

    Ok(Json(RefreshResponse {
        refresh,
        dashboard: snapshot,
    }))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/refresh", post(refresh_dashboard))
}
