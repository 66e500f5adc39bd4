//! Research report records

use chrono::Utc;
use cia_common::db::{ResearchReport, SourceLink};
use cia_common::time::{parse_rfc3339, to_rfc3339};
use cia_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{from_json, parse_uuid, settings, to_json};
use crate::utils::retry_on_lock;

fn from_row(row: &SqliteRow) -> Result<ResearchReport> {
    Ok(ResearchReport {
        id: parse_uuid("research_reports.id", row.get("id"))?,
        company_name: row.get("company_name"),
        source_count: row.get("source_count"),
        summary: row.get("summary"),
        sources: from_json("research_reports.sources", row.get("sources"))?,
        completed_at: parse_rfc3339(row.get("completed_at"))?,
    })
}

/// Persist a finished research run
pub async fn save(
    pool: &SqlitePool,
    company_name: &str,
    summary: &str,
    sources: &[SourceLink],
    source_count: i64,
) -> Result<ResearchReport> {
    if source_count < 0 {
        return Err(Error::InvalidInput(format!(
            "source_count must be non-negative, got {}",
            source_count
        )));
    }

    let report = ResearchReport {
        id: Uuid::new_v4(),
        company_name: company_name.trim().to_string(),
        source_count,
        summary: summary.to_string(),
        sources: sources.to_vec(),
        completed_at: Utc::now(),
    };

    let id = report.id.to_string();
    let sources_json = to_json(&report.sources)?;
    let completed_at = to_rfc3339(&report.completed_at);
    let max_wait_ms = settings::max_lock_wait_ms(pool).await?;

    retry_on_lock("save_research_report", max_wait_ms, || async {
        sqlx::query(
            "INSERT INTO research_reports (id, company_name, source_count, summary, sources, completed_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&report.company_name)
        .bind(report.source_count)
        .bind(&report.summary)
        .bind(&sources_json)
        .bind(&completed_at)
        .execute(pool)
        .await?;
        Ok(())
    })
    .await?;

    tracing::info!(
        report_id = %report.id,
        company = %report.company_name,
        source_count,
        "Research report saved"
    );

    Ok(report)
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<ResearchReport>> {
    let row = sqlx::query("SELECT * FROM research_reports WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Most recent reports first
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<ResearchReport>> {
    let rows = sqlx::query("SELECT * FROM research_reports ORDER BY completed_at DESC LIMIT ?")
        .bind(limit.max(0))
        .fetch_all(pool)
        .await?;
    rows.iter().map(from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cia_common::db::init_memory_database;

    fn link(n: u32) -> SourceLink {
        SourceLink {
            title: format!("Source {}", n),
            url: format!("https://example.com/{}", n),
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let pool = init_memory_database().await.unwrap();
        let saved = save(&pool, " Acme ", "Expanding into EU", &[link(1), link(2)], 7)
            .await
            .unwrap();

        let loaded = get(&pool, saved.id).await.unwrap().unwrap();
        assert_eq!(loaded.company_name, "Acme");
        assert_eq!(loaded.source_count, 7);
        assert_eq!(loaded.sources.len(), 2);
        assert_eq!(loaded.summary, "Expanding into EU");
    }

    #[tokio::test]
    async fn test_negative_source_count_rejected() {
        let pool = init_memory_database().await.unwrap();
        let err = save(&pool, "Acme", "", &[], -1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_list_recent_orders_and_limits() {
        let pool = init_memory_database().await.unwrap();
        for name in ["First", "Second", "Third"] {
            save(&pool, name, "summary", &[], 0).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let recent = list_recent(&pool, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].company_name, "Third");
        assert_eq!(recent[1].company_name, "Second");
    }
}
