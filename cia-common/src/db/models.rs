//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::risk::{RiskLevel, RiskScore};
use crate::Error;

/// A company being tracked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: Uuid,
    pub name: String,
    pub keywords: Vec<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-watch-item monitoring configuration, stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Number of news articles requested per refresh
    pub news_count: u32,
    /// Number of web results requested per refresh
    pub search_count: u32,
    /// Run the deep-research endpoint as part of each refresh
    pub deep_research: bool,
    /// Extra terms treated as negative signals when scoring
    pub risk_terms: Vec<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            news_count: 10,
            search_count: 10,
            deep_research: true,
            risk_terms: Vec::new(),
        }
    }
}

/// A monitored competitor. Competitor name and keywords are joined in on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchItem {
    pub id: Uuid,
    pub competitor_id: Uuid,
    pub competitor_name: String,
    pub keywords: Vec<String>,
    pub industry: Option<String>,
    pub monitoring: MonitoringConfig,
    pub active: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Link to a source document cited by a card or report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

/// Output of a deep-research run on a company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub id: Uuid,
    pub company_name: String,
    pub source_count: i64,
    pub summary: String,
    pub sources: Vec<SourceLink>,
    pub completed_at: DateTime<Utc>,
}

/// Risk-scored summary of recent competitor activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactCard {
    pub id: Uuid,
    pub competitor_id: Uuid,
    pub competitor_name: String,
    pub risk_score: RiskScore,
    pub risk_level: RiskLevel,
    pub summary: String,
    pub key_events: Vec<String>,
    pub sources: Vec<SourceLink>,
    pub news_count: i64,
    pub created_at: DateTime<Utc>,
}

/// One provider call as recorded by the usage tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiUsageRecord {
    pub id: i64,
    pub endpoint: String,
    pub success: bool,
    pub latency_ms: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Follow-up work item, optionally tied to an impact card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub impact_card_id: Option<Uuid>,
    pub owner: Option<String>,
    pub status: ActionStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Open,
    InProgress,
    Done,
    Dismissed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Open => "open",
            ActionStatus::InProgress => "in_progress",
            ActionStatus::Done => "done",
            ActionStatus::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ActionStatus::Open),
            "in_progress" => Ok(ActionStatus::InProgress),
            "done" => Ok(ActionStatus::Done),
            "dismissed" => Ok(ActionStatus::Dismissed),
            other => Err(Error::InvalidInput(format!("Unknown action status: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitoring_config_defaults_fill_missing_fields() {
        let config: MonitoringConfig = serde_json::from_str(r#"{"news_count": 3}"#).unwrap();
        assert_eq!(config.news_count, 3);
        assert_eq!(config.search_count, 10);
        assert!(config.deep_research);
        assert!(config.risk_terms.is_empty());
    }

    #[test]
    fn test_action_status_strings() {
        for status in [
            ActionStatus::Open,
            ActionStatus::InProgress,
            ActionStatus::Done,
            ActionStatus::Dismissed,
        ] {
            assert_eq!(status.as_str().parse::<ActionStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::String(status.as_str().to_string())
            );
        }
        assert!("closed".parse::<ActionStatus>().is_err());
    }
}
