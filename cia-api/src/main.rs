//! cia-api - Enterprise CIA dashboard backend
//!
//! Serves watch items, impact cards, research reports, provider usage metrics
//! and action items over HTTP, with an SSE stream of live events. A background
//! scheduler periodically refreshes every active watch item.

use anyhow::{Context, Result};
use clap::Parser;
use cia_common::config::{
    load_toml_config_or_default, resolve_config_path, RootFolderInitializer, RootFolderResolver,
};
use cia_common::events::EventBus;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use cia_api::db::settings::{self, MAX_LOCK_WAIT_KEY};
use cia_api::provider::{HttpProvider, HttpProviderConfig};
use cia_api::services::{Orchestrator, WatchScheduler};
use cia_api::AppState;

const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for cia-api
#[derive(Parser, Debug)]
#[command(name = "cia-api")]
#[command(about = "Enterprise CIA competitive-intelligence backend")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "CIA_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not start the periodic watch refresh
    #[arg(long)]
    no_scheduler: bool,
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "cia_api={level},cia_common={level},tower_http={level}",
        level = level
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise start at info and switch to the configured
    // level once the config file has been read
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter_layer, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| default_filter("info")));
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cia-api v{}", env!("CARGO_PKG_VERSION"));

    let config_path = resolve_config_path(args.config.as_deref());
    let config = load_toml_config_or_default(config_path.as_deref());

    if !from_env {
        if let Err(e) = filter_handle.reload(default_filter(&config.log_level())) {
            warn!("Failed to apply configured log level: {}", e);
        }
    }

    let root_folder = RootFolderResolver::new("cia-api")
        .with_cli(args.root_folder.clone())
        .with_config(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    let db = cia_common::db::init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database: {}", db_path.display());

    settings::set_setting(&db, MAX_LOCK_WAIT_KEY, &config.max_lock_wait_ms().to_string())
        .await
        .context("Failed to store lock wait setting")?;

    let provider = HttpProvider::new(HttpProviderConfig {
        base_url: config.provider_base_url(),
        api_key: config.provider_api_key(),
        timeout: Duration::from_secs(config.provider_timeout_secs()),
        min_interval_ms: config.provider_min_interval_ms(),
    })
    .context("Failed to build provider client")?;

    if !provider.has_api_key() {
        warn!(
            "No provider API key configured ({} or [provider].api_key); provider calls will fail",
            cia_common::config::ENV_PROVIDER_API_KEY
        );
    }
    info!("Provider: {}", provider.base_url());

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let cancel_token = CancellationToken::new();
    let state = AppState::new(db.clone(), event_bus.clone(), Arc::new(provider))
        .with_shutdown(cancel_token.clone());
    let scheduler_handle = if args.no_scheduler || !config.scheduler_enabled() {
        info!("Watch scheduler disabled");
        None
    } else {
        let period = Duration::from_secs(config.refresh_interval_secs());
        let orchestrator: Orchestrator = state.orchestrator.clone();
        Some(WatchScheduler::new(db, orchestrator, event_bus, period).spawn(cancel_token.clone()))
    };

    let app = cia_api::build_router(state);

    let port = args.port.unwrap_or_else(|| config.port());
    let addr: SocketAddr = format!("{}:{}", config.host(), port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host(), port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await
        .context("Server error")?;

    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            warn!("Watch scheduler task ended abnormally: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then cancels `cancel_token` so the scheduler
/// and open SSE streams stop before the server drains connections
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    cancel_token.cancel();
}
