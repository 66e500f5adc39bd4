//! Company research API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use cia_common::db::ResearchReport;
use serde::Deserialize;

use super::parse_id;
use crate::db::reports;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_REPORT_LIMIT: i64 = 20;

/// POST /research/company request
#[derive(Debug, Deserialize)]
pub struct ResearchCompanyRequest {
    pub company_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListReportsQuery {
    pub limit: Option<i64>,
}

/// POST /research/company
pub async fn research_company(
    State(state): State<AppState>,
    Json(request): Json<ResearchCompanyRequest>,
) -> ApiResult<(StatusCode, Json<ResearchReport>)> {
    tracing::info!(company = %request.company_name, "Company research requested");

    match state.orchestrator.research_company(&request.company_name).await {
        Ok(report) => Ok((StatusCode::CREATED, Json(report))),
        Err(e @ ApiError::BadRequest(_)) => Err(e),
        Err(e) => {
            state
                .record_error(format!("Research for {}: {}", request.company_name.trim(), e))
                .await;
            Err(e)
        }
    }
}

/// GET /research/company
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> ApiResult<Json<Vec<ResearchReport>>> {
    let limit = query.limit.unwrap_or(DEFAULT_REPORT_LIMIT).clamp(1, 100);
    Ok(Json(reports::list_recent(&state.db, limit).await?))
}

/// GET /research/company/:id
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResearchReport>> {
    let id = parse_id(&id)?;
    reports::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Research report {}", id)))
}

pub fn research_routes() -> Router<AppState> {
    Router::new()
        .route("/research/company", get(list_reports).post(research_company))
        .route("/research/company/:id", get(get_report))
}
