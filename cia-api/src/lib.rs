//! cia-api library interface
//!
//! Exposes the router and state so integration tests can drive the service
//! in-process.

pub mod api;
pub mod db;
pub mod error;
pub mod provider;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use cia_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::provider::IntelligenceProvider;
use crate::services::Orchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Provider calls, usage tracking and persistence of their results
    pub orchestrator: Orchestrator,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
    /// Cancelled when the server begins shutting down; ends SSE streams
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, provider: Arc<dyn IntelligenceProvider>) -> Self {
        let orchestrator = Orchestrator::new(provider, db.clone(), event_bus.clone());
        Self {
            db,
            event_bus,
            orchestrator,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Share the server's shutdown token with long-lived handlers
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Remember an error for the health endpoint
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .nest(
            "/api/v1",
            Router::new()
                .merge(api::watch_routes())
                .merge(api::impact_routes())
                .merge(api::research_routes())
                .merge(api::metrics_routes())
                .merge(api::action_routes())
                .merge(api::dashboard_routes())
                .merge(api::event_routes()),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
