//! Watch item API handlers
//!
//! GET/POST /watch, GET/PATCH/DELETE /watch/:id, POST /watch/:id/generate

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use cia_common::db::{ImpactCard, MonitoringConfig, WatchItem};
use cia_common::events::CiaEvent;
use serde::Deserialize;

use super::parse_id;
use crate::db::competitors::CompetitorInput;
use crate::db::watch_items;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListWatchQuery {
    #[serde(default)]
    pub active: Option<bool>,
}

/// POST /watch request
#[derive(Debug, Deserialize)]
pub struct CreateWatchRequest {
    pub competitor_name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub monitoring: Option<MonitoringConfig>,
}

/// PATCH /watch/:id request
#[derive(Debug, Deserialize)]
pub struct UpdateWatchRequest {
    pub active: bool,
}

/// GET /watch
pub async fn list_watch_items(
    State(state): State<AppState>,
    Query(query): Query<ListWatchQuery>,
) -> ApiResult<Json<Vec<WatchItem>>> {
    let items = watch_items::list(&state.db, query.active.unwrap_or(false)).await?;
    Ok(Json(items))
}

/// POST /watch
///
/// Creates (or reuses) the competitor and puts it under watch. A competitor
/// may have only one active watch item.
pub async fn create_watch_item(
    State(state): State<AppState>,
    Json(request): Json<CreateWatchRequest>,
) -> ApiResult<(StatusCode, Json<WatchItem>)> {
    let name = request.competitor_name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("competitor_name must not be empty".to_string()));
    }

    if watch_items::active_exists_for_name(&state.db, name).await? {
        return Err(ApiError::Conflict(format!("{} is already being watched", name)));
    }

    let competitor = CompetitorInput {
        name: name.to_string(),
        keywords: request.keywords,
        industry: request.industry,
        description: request.description,
    };
    let monitoring = request.monitoring.unwrap_or_default();

    let item = watch_items::create(&state.db, &competitor, &monitoring).await?;

    state.event_bus.emit_lossy(CiaEvent::WatchItemCreated {
        watch_item_id: item.id,
        competitor_id: item.competitor_id,
        competitor_name: item.competitor_name.clone(),
        timestamp: Utc::now(),
    });

    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /watch/:id
pub async fn get_watch_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WatchItem>> {
    let id = parse_id(&id)?;
    watch_items::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Watch item {}", id)))
}

/// PATCH /watch/:id
pub async fn update_watch_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateWatchRequest>,
) -> ApiResult<Json<WatchItem>> {
    let id = parse_id(&id)?;

    let item = watch_items::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Watch item {}", id)))?;

    if request.active
        && !item.active
        && watch_items::active_exists_for_name(&state.db, &item.competitor_name).await?
    {
        return Err(ApiError::Conflict(format!(
            "{} is already being watched",
            item.competitor_name
        )));
    }

    watch_items::set_active(&state.db, id, request.active).await?;
    tracing::info!(watch_item_id = %id, active = request.active, "Watch item updated");

    watch_items::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Watch item {}", id)))
}

/// DELETE /watch/:id
pub async fn delete_watch_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;

    if !watch_items::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Watch item {}", id)));
    }

    tracing::info!(watch_item_id = %id, "Watch item deleted");
    state.event_bus.emit_lossy(CiaEvent::WatchItemDeleted {
        watch_item_id: id,
        timestamp: Utc::now(),
    });

    Ok(StatusCode::NO_CONTENT)
}

/// POST /watch/:id/generate
///
/// Runs the provider calls for this item now and returns the new card.
pub async fn generate_impact_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<ImpactCard>)> {
    let id = parse_id(&id)?;

    let item = watch_items::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Watch item {}", id)))?;

    match state.orchestrator.generate_impact_card(&item).await {
        Ok(card) => Ok((StatusCode::CREATED, Json(card))),
        Err(e) => {
            state
                .record_error(format!("Impact card for {}: {}", item.competitor_name, e))
                .await;
            Err(e)
        }
    }
}

pub fn watch_routes() -> Router<AppState> {
    Router::new()
        .route("/watch", get(list_watch_items).post(create_watch_item))
        .route(
            "/watch/:id",
            get(get_watch_item)
                .patch(update_watch_item)
                .delete(delete_watch_item),
        )
        .route("/watch/:id/generate", post(generate_impact_card))
}
