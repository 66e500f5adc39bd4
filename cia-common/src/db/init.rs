//! Database initialization
//!
//! Opens (or creates) the SQLite store and applies the schema. Every
//! statement is `IF NOT EXISTS`, so initialization is safe to repeat on
//! each startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL allows dashboard readers alongside the scheduler's writes
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Limited to one connection that never expires: every SQLite `:memory:`
/// connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_competitors_table(pool).await?;
    create_watch_items_table(pool).await?;
    create_research_reports_table(pool).await?;
    create_impact_cards_table(pool).await?;
    create_api_usage_table(pool).await?;
    create_actions_table(pool).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_competitors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS competitors (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            keywords TEXT NOT NULL DEFAULT '[]',
            industry TEXT,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_watch_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS watch_items (
            id TEXT PRIMARY KEY,
            competitor_id TEXT NOT NULL REFERENCES competitors(id) ON DELETE CASCADE,
            monitoring TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            last_checked_at TEXT,
            last_error TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_watch_items_competitor ON watch_items(competitor_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_research_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS research_reports (
            id TEXT PRIMARY KEY,
            company_name TEXT NOT NULL,
            source_count INTEGER NOT NULL DEFAULT 0 CHECK (source_count >= 0),
            summary TEXT NOT NULL,
            sources TEXT NOT NULL DEFAULT '[]',
            completed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_research_reports_completed ON research_reports(completed_at)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_impact_cards_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS impact_cards (
            id TEXT PRIMARY KEY,
            competitor_id TEXT NOT NULL REFERENCES competitors(id) ON DELETE CASCADE,
            risk_score INTEGER NOT NULL CHECK (risk_score BETWEEN 0 AND 100),
            risk_level TEXT NOT NULL CHECK (risk_level IN ('low', 'medium', 'high', 'critical')),
            summary TEXT NOT NULL,
            key_events TEXT NOT NULL DEFAULT '[]',
            sources TEXT NOT NULL DEFAULT '[]',
            news_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_impact_cards_created ON impact_cards(created_at)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_api_usage_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_usage (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            endpoint TEXT NOT NULL,
            success INTEGER NOT NULL,
            latency_ms INTEGER NOT NULL,
            error TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_api_usage_created ON api_usage(created_at)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_actions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS actions (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            impact_card_id TEXT REFERENCES impact_cards(id) ON DELETE SET NULL,
            owner TEXT,
            status TEXT NOT NULL DEFAULT 'open'
                CHECK (status IN ('open', 'in_progress', 'done', 'dismissed')),
            due_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_memory_database_has_all_tables() {
        let pool = init_memory_database().await.unwrap();
        let tables = table_names(&pool).await;

        for expected in [
            "actions",
            "api_usage",
            "competitors",
            "impact_cards",
            "research_reports",
            "settings",
            "watch_items",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_risk_level_check_constraint() {
        let pool = init_memory_database().await.unwrap();
        sqlx::query(
            "INSERT INTO competitors (id, name, created_at, updated_at) VALUES ('c1', 'Acme', 'x', 'x')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let result = sqlx::query(
            "INSERT INTO impact_cards (id, competitor_id, risk_score, risk_level, summary, created_at)
             VALUES ('i1', 'c1', 50, 'severe', 's', 'x')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err(), "unknown risk level must be rejected");

        let result = sqlx::query(
            "INSERT INTO impact_cards (id, competitor_id, risk_score, risk_level, summary, created_at)
             VALUES ('i2', 'c1', 140, 'high', 's', 'x')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err(), "out-of-range score must be rejected");
    }

    #[tokio::test]
    async fn test_file_database_created() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("cia.db");

        let pool = init_database(&db_path).await.unwrap();
        assert!(db_path.exists());
        assert!(table_names(&pool).await.contains(&"watch_items".to_string()));
    }
}
