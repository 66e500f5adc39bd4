//! Database access for cia-api
//!
//! One module per table. Ids are stored as UUID text, timestamps as RFC 3339
//! text, list-valued columns as JSON text.

pub mod actions;
pub mod api_usage;
pub mod competitors;
pub mod impact_cards;
pub mod reports;
pub mod settings;
pub mod watch_items;

use cia_common::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid UUID in {}: {} ({})", column, value, e)))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn from_json<T: DeserializeOwned>(column: &str, value: &str) -> Result<T> {
    serde_json::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", column, e)))
}
