//! Key/value settings table

use cia_common::Result;
use sqlx::SqlitePool;

/// Upper bound on lock retry time for writes, in milliseconds
pub const MAX_LOCK_WAIT_KEY: &str = "database_max_lock_wait_ms";

const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Configured lock wait, falling back to 5000ms when unset or unparsable
pub async fn max_lock_wait_ms(pool: &SqlitePool) -> Result<u64> {
    Ok(get_setting(pool, MAX_LOCK_WAIT_KEY)
        .await?
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_MAX_LOCK_WAIT_MS))
}
