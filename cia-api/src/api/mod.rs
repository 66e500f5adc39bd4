//! HTTP API handlers for cia-api
//!
//! REST endpoints under `/api/v1` plus an SSE event stream.

pub mod actions;
pub mod dashboard;
pub mod health;
pub mod impact;
pub mod metrics;
pub mod research;
pub mod sse;
pub mod watch;

pub use actions::action_routes;
pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use impact::impact_routes;
pub use metrics::metrics_routes;
pub use research::research_routes;
pub use sse::event_routes;
pub use watch::watch_routes;

use uuid::Uuid;

use crate::error::ApiError;

/// Parse a path id, mapping malformed ids to 400
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid id: {}", raw)))
}
