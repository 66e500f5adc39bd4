//! Dashboard snapshot assembly

use chrono::{DateTime, Utc};
use cia_common::db::{ImpactCard, ResearchReport};
use serde::Serialize;
use sqlx::SqlitePool;

use super::orchestrator::Orchestrator;
use super::usage::{self, DEFAULT_SUMMARY_HOURS};
use crate::db::api_usage::UsageSummary;
use crate::db::impact_cards::{self, ImpactCardFilter, RiskDistribution};
use crate::db::{reports, watch_items};
use crate::error::ApiResult;

/// Alerts and reports shown when no limit is requested
pub const DEFAULT_DASHBOARD_LIMIT: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct WatchCounts {
    pub total: i64,
    pub active: i64,
}

/// Everything the dashboard renders in one response
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub alerts: Vec<ImpactCard>,
    pub reports: Vec<ResearchReport>,
    pub watch: WatchCounts,
    pub risk_distribution: RiskDistribution,
    pub usage: UsageSummary,
    pub generated_at: DateTime<Utc>,
}

/// Outcome of a manual or scheduled refresh pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

/// Load the snapshot; independent sections are fetched concurrently
pub async fn load_dashboard(pool: &SqlitePool, limit: i64) -> ApiResult<DashboardSnapshot> {
    let limit = limit.clamp(1, 100);
    let filter = ImpactCardFilter {
        limit,
        ..Default::default()
    };

    let (alerts, reports, (total, active), risk_distribution, usage) = tokio::try_join!(
        impact_cards::list_recent(pool, &filter),
        reports::list_recent(pool, limit),
        watch_items::counts(pool),
        impact_cards::risk_distribution(pool),
        usage::summarize(pool, DEFAULT_SUMMARY_HOURS),
    )?;

    Ok(DashboardSnapshot {
        alerts,
        reports,
        watch: WatchCounts { total, active },
        risk_distribution,
        usage,
        generated_at: Utc::now(),
    })
}

/// Generate a fresh impact card for every active watch item. Items are
/// processed one at a time; a failing item is counted and skipped.
pub async fn refresh_active_items(
    pool: &SqlitePool,
    orchestrator: &Orchestrator,
) -> ApiResult<RefreshSummary> {
    let items = watch_items::list(pool, true).await?;
    let mut summary = RefreshSummary::default();

    for item in &items {
        match orchestrator.generate_impact_card(item).await {
            Ok(card) => {
                summary.refreshed += 1;
                tracing::debug!(
                    competitor = %item.competitor_name,
                    risk_score = card.risk_score.value(),
                    "Watch item refreshed"
                );
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(
                    competitor = %item.competitor_name,
                    watch_item_id = %item.id,
                    error = %e,
                    "Watch item refresh failed"
                );
            }
        }
    }

    tracing::info!(
        refreshed = summary.refreshed,
        failed = summary.failed,
        "Refresh pass complete"
    );

    Ok(summary)
}

/// Refresh all active items, then reload the snapshot
pub async fn refresh_dashboard(
    pool: &SqlitePool,
    orchestrator: &Orchestrator,
    limit: i64,
) -> ApiResult<(RefreshSummary, DashboardSnapshot)> {
    let summary = refresh_active_items(pool, orchestrator).await?;
    let snapshot = load_dashboard(pool, limit).await?;
    Ok((summary, snapshot))
}
