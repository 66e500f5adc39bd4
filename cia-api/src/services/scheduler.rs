//! Periodic refresh of active watch items

use chrono::Utc;
use cia_common::events::{CiaEvent, EventBus};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::dashboard::{self, RefreshSummary};
use super::orchestrator::Orchestrator;
use crate::error::ApiResult;

/// Runs a refresh pass every `period` until cancelled
///
/// The first pass happens one full period after start, not at startup.
pub struct WatchScheduler {
    db: SqlitePool,
    orchestrator: Orchestrator,
    events: EventBus,
    period: Duration,
}

impl WatchScheduler {
    pub fn new(db: SqlitePool, orchestrator: Orchestrator, events: EventBus, period: Duration) -> Self {
        Self {
            db,
            orchestrator,
            events,
            period,
        }
    }

    /// One pass over all active watch items, announced with `RefreshCycleCompleted`
    pub async fn run_cycle(&self) -> ApiResult<RefreshSummary> {
        let summary = dashboard::refresh_active_items(&self.db, &self.orchestrator).await?;

        self.events.emit_lossy(CiaEvent::RefreshCycleCompleted {
            refreshed: summary.refreshed,
            failed: summary.failed,
            timestamp: Utc::now(),
        });

        Ok(summary)
    }

    /// Loop until `cancel_token` fires. A cycle in progress is abandoned on cancel.
    pub async fn run(self, cancel_token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; consume that tick
        ticker.tick().await;

        tracing::info!(period_secs = self.period.as_secs(), "Watch scheduler started");

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel_token.cancelled() => break,
                        result = self.run_cycle() => {
                            if let Err(e) = result {
                                tracing::error!(error = %e, "Refresh cycle failed");
                            }
                        }
                    }
                }
            }
        }

        tracing::info!("Watch scheduler stopped");
    }

    pub fn spawn(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel_token))
    }
}
