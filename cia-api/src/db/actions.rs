//! Action items

use chrono::{DateTime, Utc};
use cia_common::db::{ActionItem, ActionStatus};
use cia_common::time::{parse_optional, parse_rfc3339, to_rfc3339};
use cia_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

#[derive(Debug, Clone, Default)]
pub struct NewAction {
    pub title: String,
    pub description: Option<String>,
    pub impact_card_id: Option<Uuid>,
    pub owner: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
}

fn from_row(row: &SqliteRow) -> Result<ActionItem> {
    let status: String = row.get("status");
    let impact_card_id: Option<String> = row.get("impact_card_id");
    Ok(ActionItem {
        id: parse_uuid("actions.id", row.get("id"))?,
        title: row.get("title"),
        description: row.get("description"),
        impact_card_id: impact_card_id
            .as_deref()
            .map(|id| parse_uuid("actions.impact_card_id", id))
            .transpose()?,
        owner: row.get("owner"),
        status: status.parse()?,
        due_at: parse_optional(row.get("due_at"))?,
        created_at: parse_rfc3339(row.get("created_at"))?,
        updated_at: parse_rfc3339(row.get("updated_at"))?,
    })
}

/// Create an open action. A referenced impact card must exist.
pub async fn create(pool: &SqlitePool, action: &NewAction) -> Result<ActionItem> {
    let title = action.title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Action title must not be empty".to_string()));
    }

    if let Some(card_id) = action.impact_card_id {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM impact_cards WHERE id = ?")
            .bind(card_id.to_string())
            .fetch_one(pool)
            .await?;
        if exists == 0 {
            return Err(Error::InvalidInput(format!("Unknown impact card: {}", card_id)));
        }
    }

    let id = Uuid::new_v4();
    let now = to_rfc3339(&Utc::now());

    sqlx::query(
        "INSERT INTO actions (id, title, description, impact_card_id, owner, status, due_at, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(title)
    .bind(&action.description)
    .bind(action.impact_card_id.map(|id| id.to_string()))
    .bind(&action.owner)
    .bind(ActionStatus::Open.as_str())
    .bind(action.due_at.as_ref().map(to_rfc3339))
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    get(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Action {}", id)))
}

pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Option<ActionItem>> {
    let row = sqlx::query("SELECT * FROM actions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// List actions, newest first, optionally by status
pub async fn list(pool: &SqlitePool, status: Option<ActionStatus>) -> Result<Vec<ActionItem>> {
    let rows = sqlx::query(
        "SELECT * FROM actions WHERE (?1 IS NULL OR status = ?1) ORDER BY created_at DESC",
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

/// Set an action's status. Returns None when the action does not exist.
pub async fn update_status(
    pool: &SqlitePool,
    id: Uuid,
    status: ActionStatus,
) -> Result<Option<ActionItem>> {
    let result = sqlx::query("UPDATE actions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(to_rfc3339(&Utc::now()))
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get(pool, id).await
}
