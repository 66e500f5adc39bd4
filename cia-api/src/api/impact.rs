//! Impact card API handlers

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use cia_common::db::ImpactCard;
use cia_common::RiskLevel;
use serde::Deserialize;

use super::parse_id;
use crate::db::impact_cards::{self, ImpactCardFilter, DEFAULT_LIST_LIMIT};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const MAX_LIST_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ListImpactCardsQuery {
    pub competitor_id: Option<String>,
    pub level: Option<String>,
    pub limit: Option<i64>,
}

impl ListImpactCardsQuery {
    fn into_filter(self) -> ApiResult<ImpactCardFilter> {
        let competitor_id = self.competitor_id.as_deref().map(parse_id).transpose()?;
        let level = self
            .level
            .as_deref()
            .map(str::parse::<RiskLevel>)
            .transpose()?;
        let limit = self
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);

        Ok(ImpactCardFilter {
            competitor_id,
            level,
            limit,
        })
    }
}

/// GET /impact-cards?competitor_id=&level=&limit=
pub async fn list_impact_cards(
    State(state): State<AppState>,
    Query(query): Query<ListImpactCardsQuery>,
) -> ApiResult<Json<Vec<ImpactCard>>> {
    let filter = query.into_filter()?;
    Ok(Json(impact_cards::list_recent(&state.db, &filter).await?))
}

/// GET /impact-cards/:id
pub async fn get_impact_card(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ImpactCard>> {
    let id = parse_id(&id)?;
    impact_cards::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Impact card {}", id)))
}

pub fn impact_routes() -> Router<AppState> {
    Router::new()
        .route("/impact-cards", get(list_impact_cards))
        .route("/impact-cards/:id", get(get_impact_card))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_into_filter() {
        let filter = ListImpactCardsQuery {
            level: Some("HIGH".to_string()),
            limit: Some(10_000),
            ..Default::default()
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.level, Some(RiskLevel::High));
        assert_eq!(filter.limit, MAX_LIST_LIMIT);

        let bad = ListImpactCardsQuery {
            level: Some("severe".to_string()),
            ..Default::default()
        };
        assert!(bad.into_filter().is_err());
    }
}
