//! Provider call log

use chrono::{DateTime, Utc};
use cia_common::db::ApiUsageRecord;
use cia_common::time::{parse_rfc3339, to_rfc3339};
use cia_common::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Aggregated usage for one provider endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointUsage {
    pub endpoint: String,
    pub calls: i64,
    pub errors: i64,
    pub avg_latency_ms: f64,
}

/// Aggregated usage since a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub since: DateTime<Utc>,
    pub total_calls: i64,
    pub total_errors: i64,
    pub avg_latency_ms: f64,
    pub endpoints: Vec<EndpointUsage>,
}

fn from_row(row: &SqliteRow) -> Result<ApiUsageRecord> {
    Ok(ApiUsageRecord {
        id: row.get("id"),
        endpoint: row.get("endpoint"),
        success: row.get::<i64, _>("success") != 0,
        latency_ms: row.get("latency_ms"),
        error: row.get("error"),
        created_at: parse_rfc3339(row.get("created_at"))?,
    })
}

pub async fn record(
    pool: &SqlitePool,
    endpoint: &str,
    success: bool,
    latency_ms: i64,
    error: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO api_usage (endpoint, success, latency_ms, error, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(endpoint)
    .bind(success as i64)
    .bind(latency_ms.max(0))
    .bind(error)
    .bind(to_rfc3339(&Utc::now()))
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Most recent calls first
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<ApiUsageRecord>> {
    let rows = sqlx::query("SELECT * FROM api_usage ORDER BY id DESC LIMIT ?")
        .bind(limit.max(0))
        .fetch_all(pool)
        .await?;
    rows.iter().map(from_row).collect()
}

/// Per-endpoint and overall totals for calls made at or after `since`
pub async fn summary(pool: &SqlitePool, since: DateTime<Utc>) -> Result<UsageSummary> {
    let rows = sqlx::query(
        "SELECT endpoint,
                COUNT(*) AS calls,
                SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END) AS errors,
                SUM(latency_ms) AS latency_total
         FROM api_usage
         WHERE created_at >= ?
         GROUP BY endpoint
         ORDER BY endpoint",
    )
    .bind(to_rfc3339(&since))
    .fetch_all(pool)
    .await?;

    let mut total_calls = 0i64;
    let mut total_errors = 0i64;
    let mut total_latency = 0i64;
    let mut endpoints = Vec::with_capacity(rows.len());

    for row in &rows {
        let calls: i64 = row.get("calls");
        let errors: i64 = row.get("errors");
        let latency_total: i64 = row.get("latency_total");

        total_calls += calls;
        total_errors += errors;
        total_latency += latency_total;

        endpoints.push(EndpointUsage {
            endpoint: row.get("endpoint"),
            calls,
            errors,
            avg_latency_ms: average(latency_total, calls),
        });
    }

    Ok(UsageSummary {
        since,
        total_calls,
        total_errors,
        avg_latency_ms: average(total_latency, total_calls),
        endpoints,
    })
}

fn average(total: i64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cia_common::db::init_memory_database;

    #[tokio::test]
    async fn test_record_and_list() {
        let pool = init_memory_database().await.unwrap();
        record(&pool, "news", true, 120, None).await.unwrap();
        record(&pool, "search", false, 80, Some("HTTP 500")).await.unwrap();

        let recent = list_recent(&pool, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].endpoint, "search");
        assert!(!recent[0].success);
        assert_eq!(recent[0].error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn test_summary_groups_by_endpoint() {
        let pool = init_memory_database().await.unwrap();
        record(&pool, "news", true, 100, None).await.unwrap();
        record(&pool, "news", false, 300, Some("timeout")).await.unwrap();
        record(&pool, "research", true, 600, None).await.unwrap();

        let summary = summary(&pool, Utc::now() - Duration::hours(1)).await.unwrap();
        assert_eq!(summary.total_calls, 3);
        assert_eq!(summary.total_errors, 1);
        assert!((summary.avg_latency_ms - 1000.0 / 3.0).abs() < 1e-9);

        let news = summary.endpoints.iter().find(|e| e.endpoint == "news").unwrap();
        assert_eq!(news.calls, 2);
        assert_eq!(news.errors, 1);
        assert_eq!(news.avg_latency_ms, 200.0);
    }

    #[tokio::test]
    async fn test_summary_excludes_older_calls() {
        let pool = init_memory_database().await.unwrap();
        record(&pool, "news", true, 100, None).await.unwrap();

        let summary = summary(&pool, Utc::now() + Duration::minutes(1)).await.unwrap();
        assert_eq!(summary.total_calls, 0);
        assert_eq!(summary.avg_latency_ms, 0.0);
        assert!(summary.endpoints.is_empty());
    }
}
