//! Impact card records

use cia_common::db::ImpactCard;
use cia_common::time::{parse_rfc3339, to_rfc3339};
use cia_common::{Error, Result, RiskLevel, RiskScore};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{from_json, parse_uuid, settings, to_json};
use crate::utils::retry_on_lock;

/// Default number of cards returned by list queries
pub const DEFAULT_LIST_LIMIT: i64 = 50;

const SELECT_IMPACT_CARD: &str = r#"
    SELECT i.id, i.competitor_id, i.risk_score, i.risk_level, i.summary,
           i.key_events, i.sources, i.news_count, i.created_at,
           c.name AS competitor_name
    FROM impact_cards i
    JOIN competitors c ON c.id = i.competitor_id
"#;

/// Optional filters for [`list_recent`]
#[derive(Debug, Clone)]
pub struct ImpactCardFilter {
    pub competitor_id: Option<Uuid>,
    pub level: Option<RiskLevel>,
    pub limit: i64,
}

impl Default for ImpactCardFilter {
    fn default() -> Self {
        Self {
            competitor_id: None,
            level: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// Card counts per risk level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub critical: i64,
}

impl RiskDistribution {
    pub fn total(&self) -> i64 {
        self.low + self.medium + self.high + self.critical
    }

    fn add(&mut self, level: RiskLevel, count: i64) {
        match level {
            RiskLevel::Low => self.low += count,
            RiskLevel::Medium => self.medium += count,
            RiskLevel::High => self.high += count,
            RiskLevel::Critical => self.critical += count,
        }
    }
}

fn from_row(row: &SqliteRow) -> Result<ImpactCard> {
    let level: String = row.get("risk_level");
    Ok(ImpactCard {
        id: parse_uuid("impact_cards.id", row.get("id"))?,
        competitor_id: parse_uuid("impact_cards.competitor_id", row.get("competitor_id"))?,
        competitor_name: row.get("competitor_name"),
        risk_score: RiskScore::new(row.get("risk_score"))?,
        risk_level: level.parse()?,
        summary: row.get("summary"),
        key_events: from_json("impact_cards.key_events", row.get("key_events"))?,
        sources: from_json("impact_cards.sources", row.get("sources"))?,
        news_count: row.get("news_count"),
        created_at: parse_rfc3339(row.get("created_at"))?,
    })
}

/// Persist a card. The stored level always agrees with the score.
pub async fn save(pool: &SqlitePool, card: &ImpactCard) -> Result<()> {
    if card.risk_level != card.risk_score.level() {
        return Err(Error::InvalidInput(format!(
            "Risk level {} does not match score {}",
            card.risk_level,
            card.risk_score.value()
        )));
    }

    let id = card.id.to_string();
    let competitor_id = card.competitor_id.to_string();
    let key_events = to_json(&card.key_events)?;
    let sources = to_json(&card.sources)?;
    let created_at = to_rfc3339(&card.created_at);
    let max_wait_ms = settings::max_lock_wait_ms(pool).await?;

    retry_on_lock("save_impact_card", max_wait_ms, || async {
        sqlx::query(
            "INSERT INTO impact_cards
             (id, competitor_id, risk_score, risk_level, summary, key_events, sources, news_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&competitor_id)
        .bind(card.risk_score.value())
        .bind(card.risk_level.as_str())
        .bind(&card.summary)
        .bind(&key_events)
        .bind(&sources)
        .bind(card.news_count)
        .bind(&created_at)
        .execute(pool)
        .await?;
        Ok(())
    })
    .await?;

    tracing::info!(
        impact_card_id = %card.id,
        competitor = %card.competitor_name,
        risk_score = card.risk_score.value(),
        risk_level = %card.risk_level,
        "Impact card saved"
    );

    Ok(())
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<ImpactCard>> {
    let row = sqlx::query(&format!("{} WHERE i.id = ?", SELECT_IMPACT_CARD))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Newest cards first, optionally narrowed to a competitor and/or level
pub async fn list_recent(pool: &SqlitePool, filter: &ImpactCardFilter) -> Result<Vec<ImpactCard>> {
    let competitor_id = filter.competitor_id.map(|id| id.to_string());
    let level = filter.level.map(|l| l.as_str());

    let rows = sqlx::query(&format!(
        "{} WHERE (?1 IS NULL OR i.competitor_id = ?1)
            AND (?2 IS NULL OR i.risk_level = ?2)
          ORDER BY i.created_at DESC
          LIMIT ?3",
        SELECT_IMPACT_CARD
    ))
    .bind(competitor_id)
    .bind(level)
    .bind(filter.limit.max(0))
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Count of all stored cards per risk level
pub async fn risk_distribution(pool: &SqlitePool) -> Result<RiskDistribution> {
    let rows = sqlx::query("SELECT risk_level, COUNT(*) AS n FROM impact_cards GROUP BY risk_level")
        .fetch_all(pool)
        .await?;

    let mut distribution = RiskDistribution::default();
    for row in &rows {
        let level: String = row.get("risk_level");
        distribution.add(level.parse()?, row.get("n"));
    }
    Ok(distribution)
}
