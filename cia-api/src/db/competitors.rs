//! Competitor records

use chrono::Utc;
use cia_common::db::Competitor;
use cia_common::time::{parse_rfc3339, to_rfc3339};
use cia_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{from_json, parse_uuid, to_json};

/// Fields supplied when creating or refreshing a competitor
#[derive(Debug, Clone, Default)]
pub struct CompetitorInput {
    pub name: String,
    pub keywords: Vec<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
}

/// Normalize keywords: trim, drop blanks, dedupe case-insensitively, keep order
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.to_lowercase()))
        .map(str::to_string)
        .collect()
}

fn from_row(row: &SqliteRow) -> Result<Competitor> {
    Ok(Competitor {
        id: parse_uuid("competitors.id", row.get("id"))?,
        name: row.get("name"),
        keywords: from_json("competitors.keywords", row.get("keywords"))?,
        industry: row.get("industry"),
        description: row.get("description"),
        created_at: parse_rfc3339(row.get("created_at"))?,
        updated_at: parse_rfc3339(row.get("updated_at"))?,
    })
}

/// Insert a competitor, or refresh the existing one with the same name
///
/// Names match case-insensitively and the stored spelling is kept. On
/// refresh, non-empty keywords replace the stored list and provided
/// industry/description overwrite stored values. A single upsert statement,
/// so concurrent callers with the same new name all land on one row.
pub async fn upsert_by_name(pool: &SqlitePool, input: &CompetitorInput) -> Result<Competitor> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Competitor name must not be empty".to_string()));
    }

    let keywords = normalize_keywords(&input.keywords);
    let now = to_rfc3339(&Utc::now());
    let id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO competitors (id, name, keywords, industry, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
         ON CONFLICT(name) DO UPDATE SET
             keywords = CASE WHEN ?7 THEN competitors.keywords ELSE excluded.keywords END,
             industry = COALESCE(excluded.industry, competitors.industry),
             description = COALESCE(excluded.description, competitors.description),
             updated_at = excluded.updated_at",
    )
    .bind(id.to_string())
    .bind(name)
    .bind(to_json(&keywords)?)
    .bind(&input.industry)
    .bind(&input.description)
    .bind(&now)
    .bind(keywords.is_empty())
    .execute(pool)
    .await?;

    let competitor = find_by_name(pool, name)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Competitor {}", name)))?;

    if competitor.id == id {
        tracing::info!(competitor = %name, competitor_id = %id, "Competitor created");
    }

    Ok(competitor)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Competitor>> {
    let row = sqlx::query("SELECT * FROM competitors WHERE name = ? COLLATE NOCASE")
        .bind(name.trim())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<Competitor>> {
    let row = sqlx::query("SELECT * FROM competitors WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Competitor>> {
    let rows = sqlx::query("SELECT * FROM competitors ORDER BY name COLLATE NOCASE")
        .fetch_all(pool)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Delete a competitor; watch items and impact cards cascade
pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM competitors WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cia_common::db::init_memory_database;

    fn input(name: &str, keywords: &[&str]) -> CompetitorInput {
        CompetitorInput {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_keywords() {
        let raw = vec![" pricing ".to_string(), "".to_string(), "Pricing".to_string(), "AI".to_string()];
        assert_eq!(normalize_keywords(&raw), vec!["pricing", "AI"]);
    }

    #[tokio::test]
    async fn test_upsert_creates_then_reuses() {
        let pool = init_memory_database().await.unwrap();

        let first = upsert_by_name(&pool, &input("Acme Corp", &["widgets"])).await.unwrap();
        let second = upsert_by_name(&pool, &input("  acme corp ", &[])).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Acme Corp");
        assert_eq!(second.keywords, vec!["widgets"], "empty keywords keep stored list");
        assert_eq!(list(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_updates_keywords_and_industry() {
        let pool = init_memory_database().await.unwrap();
        upsert_by_name(&pool, &input("Globex", &["old"])).await.unwrap();

        let mut refreshed = input("Globex", &["new", "launch"]);
        refreshed.industry = Some("Energy".to_string());
        let updated = upsert_by_name(&pool, &refreshed).await.unwrap();

        assert_eq!(updated.keywords, vec!["new", "launch"]);
        assert_eq!(updated.industry.as_deref(), Some("Energy"));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_share_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let pool = cia_common::db::init_database(&dir.path().join("cia.db")).await.unwrap();

        let names = ["Hooli", "hooli", "HOOLI", "Hooli", "hOOli", "Hooli"];
        let results = futures::future::join_all(names.iter().map(|name| {
            let pool = pool.clone();
            let input = input(name, &["search"]);
            tokio::spawn(async move { upsert_by_name(&pool, &input).await })
        }))
        .await;

        let ids: Vec<Uuid> = results
            .into_iter()
            .map(|joined| joined.unwrap().unwrap().id)
            .collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(list(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_name_rejected() {
        let pool = init_memory_database().await.unwrap();
        let err = upsert_by_name(&pool, &input("   ", &[])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let pool = init_memory_database().await.unwrap();
        let competitor = upsert_by_name(&pool, &input("Initech", &[])).await.unwrap();

        assert!(delete(&pool, competitor.id).await.unwrap());
        assert!(!delete(&pool, competitor.id).await.unwrap());
        assert!(get(&pool, competitor.id).await.unwrap().is_none());
    }
}
