//! Provider usage tracking
//!
//! Every provider call made by the orchestrator goes through [`track`], which
//! times the call and writes one `api_usage` row. Failed calls are also
//! broadcast as `ProviderCallFailed` so dashboards can surface them.

use chrono::{Duration, Utc};
use cia_common::events::{CiaEvent, EventBus};
use sqlx::SqlitePool;
use std::future::Future;
use std::time::Instant;

use crate::db::api_usage::{self, UsageSummary};
use crate::provider::{ProviderEndpoint, ProviderError};

/// Default window for usage summaries
pub const DEFAULT_SUMMARY_HOURS: i64 = 24;

/// Longest accepted summary window (30 days)
pub const MAX_SUMMARY_HOURS: i64 = 24 * 30;

/// Time a provider call and record its outcome; the call's result is returned
/// unchanged. Failures to write the usage row are logged only.
pub async fn track<T, F>(
    pool: &SqlitePool,
    events: &EventBus,
    endpoint: ProviderEndpoint,
    call: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let started = Instant::now();
    let result = call.await;
    let latency_ms = started.elapsed().as_millis() as i64;

    let error = result.as_ref().err().map(|e| e.to_string());

    if let Err(e) = api_usage::record(
        pool,
        endpoint.as_str(),
        error.is_none(),
        latency_ms,
        error.as_deref(),
    )
    .await
    {
        tracing::warn!(endpoint = %endpoint, error = %e, "Failed to record provider usage");
    }

    match error {
        None => {
            tracing::debug!(endpoint = %endpoint, latency_ms, "Provider call succeeded");
        }
        Some(message) => {
            tracing::warn!(endpoint = %endpoint, latency_ms, error = %message, "Provider call failed");
            events.emit_lossy(CiaEvent::ProviderCallFailed {
                endpoint: endpoint.as_str().to_string(),
                error: message,
                timestamp: Utc::now(),
            });
        }
    }

    result
}

/// Usage over the last `hours` hours, clamped to 1..=MAX_SUMMARY_HOURS
pub async fn summarize(pool: &SqlitePool, hours: i64) -> cia_common::Result<UsageSummary> {
    let hours = hours.clamp(1, MAX_SUMMARY_HOURS);
    api_usage::summary(pool, Utc::now() - Duration::hours(hours)).await
}
