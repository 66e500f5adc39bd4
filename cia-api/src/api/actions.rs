//! Action item API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use cia_common::db::{ActionItem, ActionStatus};
use cia_common::events::CiaEvent;
use serde::Deserialize;
use uuid::Uuid;

use super::parse_id;
use crate::db::actions::{self, NewAction};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListActionsQuery {
    pub status: Option<String>,
}

/// POST /actions request
#[derive(Debug, Deserialize)]
pub struct CreateActionRequest {
    pub title: String,
    pub description: Option<String>,
    pub impact_card_id: Option<Uuid>,
    pub owner: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
}

/// PATCH /actions/:id request
#[derive(Debug, Deserialize)]
pub struct UpdateActionRequest {
    pub status: ActionStatus,
}

fn announce(state: &AppState, action: &ActionItem) {
    state.event_bus.emit_lossy(CiaEvent::ActionUpdated {
        action_id: action.id,
        status: action.status.to_string(),
        timestamp: Utc::now(),
    });
}

/// GET /actions?status=
pub async fn list_actions(
    State(state): State<AppState>,
    Query(query): Query<ListActionsQuery>,
) -> ApiResult<Json<Vec<ActionItem>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ActionStatus>)
        .transpose()?;
    Ok(Json(actions::list(&state.db, status).await?))
}

/// POST /actions
pub async fn create_action(
    State(state): State<AppState>,
    Json(request): Json<CreateActionRequest>,
) -> ApiResult<(StatusCode, Json<ActionItem>)> {
    let action = actions::create(
        &state.db,
        &NewAction {
            title: request.title,
            description: request.description,
            impact_card_id: request.impact_card_id,
            owner: request.owner,
            due_at: request.due_at,
        },
    )
    .await?;

    tracing::info!(action_id = %action.id, title = %action.title, "Action created");
    announce(&state, &action);

    Ok((StatusCode::CREATED, Json(action)))
}

/// PATCH /actions/:id
pub async fn update_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateActionRequest>,
) -> ApiResult<Json<ActionItem>> {
    let id = parse_id(&id)?;

    let action = actions::update_status(&state.db, id, request.status)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Action {}", id)))?;

    tracing::info!(action_id = %id, status = %action.status, "Action status updated");
    announce(&state, &action);

    Ok(Json(action))
}

pub fn action_routes() -> Router<AppState> {
    Router::new()
        .route("/actions", get(list_actions).post(create_action))
        .route("/actions/:id", patch(update_action))
}
