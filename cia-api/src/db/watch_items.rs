//! Watch item records
//!
//! A watch item puts one competitor under monitoring. Reads join the
//! competitor so callers get name and keywords in one record.

use chrono::Utc;
use cia_common::db::{MonitoringConfig, WatchItem};
use cia_common::time::{parse_optional, parse_rfc3339, to_rfc3339};
use cia_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::competitors::{self, CompetitorInput};
use super::{from_json, parse_uuid, settings, to_json};
use crate::utils::retry_on_lock;

const SELECT_WATCH_ITEM: &str = r#"
    SELECT w.id, w.competitor_id, w.monitoring, w.active, w.last_checked_at,
           w.last_error, w.created_at,
           c.name AS competitor_name, c.keywords, c.industry
    FROM watch_items w
    JOIN competitors c ON c.id = w.competitor_id
"#;

fn from_row(row: &SqliteRow) -> Result<WatchItem> {
    Ok(WatchItem {
        id: parse_uuid("watch_items.id", row.get("id"))?,
        competitor_id: parse_uuid("watch_items.competitor_id", row.get("competitor_id"))?,
        competitor_name: row.get("competitor_name"),
        keywords: from_json("competitors.keywords", row.get("keywords"))?,
        industry: row.get("industry"),
        monitoring: from_json("watch_items.monitoring", row.get("monitoring"))?,
        active: row.get::<i64, _>("active") != 0,
        last_checked_at: parse_optional(row.get("last_checked_at"))?,
        last_error: row.get("last_error"),
        created_at: parse_rfc3339(row.get("created_at"))?,
    })
}

/// Create a watch item, creating or refreshing its competitor first
pub async fn create(
    pool: &SqlitePool,
    competitor: &CompetitorInput,
    monitoring: &MonitoringConfig,
) -> Result<WatchItem> {
    let competitor = competitors::upsert_by_name(pool, competitor).await?;

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO watch_items (id, competitor_id, monitoring, active, created_at)
         VALUES (?, ?, ?, 1, ?)",
    )
    .bind(id.to_string())
    .bind(competitor.id.to_string())
    .bind(to_json(monitoring)?)
    .bind(to_rfc3339(&Utc::now()))
    .execute(pool)
    .await?;

    tracing::info!(
        watch_item_id = %id,
        competitor = %competitor.name,
        "Watch item created"
    );

    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Watch item {}", id)))
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<WatchItem>> {
    let row = sqlx::query(&format!("{} WHERE w.id = ?", SELECT_WATCH_ITEM))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// List watch items, newest first
pub async fn list(pool: &SqlitePool, active_only: bool) -> Result<Vec<WatchItem>> {
    let sql = if active_only {
        format!("{} WHERE w.active = 1 ORDER BY w.created_at DESC", SELECT_WATCH_ITEM)
    } else {
        format!("{} ORDER BY w.created_at DESC", SELECT_WATCH_ITEM)
    };

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(from_row).collect()
}

/// True if the named competitor already has an active watch item
pub async fn active_exists_for_name(pool: &SqlitePool, competitor_name: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM watch_items w
         JOIN competitors c ON c.id = w.competitor_id
         WHERE c.name = ? COLLATE NOCASE AND w.active = 1",
    )
    .bind(competitor_name.trim())
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn set_active(pool: &SqlitePool, id: Uuid, active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE watch_items SET active = ? WHERE id = ?")
        .bind(active as i64)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Record the outcome of a refresh: timestamp plus error text (None on success)
pub async fn mark_checked(pool: &SqlitePool, id: Uuid, error: Option<&str>) -> Result<()> {
    let id = id.to_string();
    let checked_at = to_rfc3339(&Utc::now());
    let max_wait_ms = settings::max_lock_wait_ms(pool).await?;

    retry_on_lock("mark_watch_item_checked", max_wait_ms, || async {
        sqlx::query("UPDATE watch_items SET last_checked_at = ?, last_error = ? WHERE id = ?")
            .bind(&checked_at)
            .bind(error)
            .bind(&id)
            .execute(pool)
            .await?;
        Ok(())
    })
    .await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM watch_items WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// (total, active) watch item counts
pub async fn counts(pool: &SqlitePool) -> Result<(i64, i64)> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS total, COALESCE(SUM(active), 0) AS active FROM watch_items",
    )
    .fetch_one(pool)
    .await?;
    Ok((row.get("total"), row.get("active")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cia_common::db::init_memory_database;

    fn competitor(name: &str) -> CompetitorInput {
        CompetitorInput {
            name: name.to_string(),
            keywords: vec!["pricing".to_string()],
            industry: Some("Software".to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let pool = init_memory_database().await.unwrap();
        let monitoring = MonitoringConfig { news_count: 5, ..Default::default() };

        let item = create(&pool, &competitor("Acme"), &monitoring).await.unwrap();
        let loaded = get(&pool, item.id).await.unwrap().unwrap();

        assert_eq!(loaded.competitor_name, "Acme");
        assert_eq!(loaded.keywords, vec!["pricing"]);
        assert_eq!(loaded.industry.as_deref(), Some("Software"));
        assert_eq!(loaded.monitoring.news_count, 5);
        assert!(loaded.active);
        assert!(loaded.last_checked_at.is_none());
    }

    #[tokio::test]
    async fn test_list_active_only() {
        let pool = init_memory_database().await.unwrap();
        let a = create(&pool, &competitor("Acme"), &MonitoringConfig::default()).await.unwrap();
        create(&pool, &competitor("Globex"), &MonitoringConfig::default()).await.unwrap();

        assert!(set_active(&pool, a.id, false).await.unwrap());

        assert_eq!(list(&pool, false).await.unwrap().len(), 2);
        let active = list(&pool, true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].competitor_name, "Globex");
        assert_eq!(counts(&pool).await.unwrap(), (2, 1));
    }

    #[tokio::test]
    async fn test_active_exists_for_name_case_insensitive() {
        let pool = init_memory_database().await.unwrap();
        let item = create(&pool, &competitor("Acme"), &MonitoringConfig::default()).await.unwrap();

        assert!(active_exists_for_name(&pool, "ACME").await.unwrap());
        set_active(&pool, item.id, false).await.unwrap();
        assert!(!active_exists_for_name(&pool, "acme").await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_checked_records_error() {
        let pool = init_memory_database().await.unwrap();
        let item = create(&pool, &competitor("Acme"), &MonitoringConfig::default()).await.unwrap();

        mark_checked(&pool, item.id, Some("provider timeout")).await.unwrap();
        let loaded = get(&pool, item.id).await.unwrap().unwrap();
        assert!(loaded.last_checked_at.is_some());
        assert_eq!(loaded.last_error.as_deref(), Some("provider timeout"));

        mark_checked(&pool, item.id, None).await.unwrap();
        assert!(get(&pool, item.id).await.unwrap().unwrap().last_error.is_none());
    }

    #[tokio::test]
    async fn test_competitor_delete_cascades() {
        let pool = init_memory_database().await.unwrap();
        let item = create(&pool, &competitor("Acme"), &MonitoringConfig::default()).await.unwrap();

        competitors::delete(&pool, item.competitor_id).await.unwrap();
        assert!(get(&pool, item.id).await.unwrap().is_none());
    }
}
