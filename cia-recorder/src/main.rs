//! cia-recorder - records dashboard demos from named profiles

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cia_common::config::{
    load_toml_config_or_default, resolve_config_path, RootFolderInitializer, RootFolderResolver,
};
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cia_recorder::config::{resolve_profiles_path, RecorderConfig};
use cia_recorder::navigation::Navigator;
use cia_recorder::sink::build_sink;
use cia_recorder::source::build_source;
use cia_recorder::{Recorder, RecorderError};

/// Command-line arguments for cia-recorder
#[derive(Parser, Debug)]
#[command(name = "cia-recorder")]
#[command(about = "Record Enterprise CIA dashboard demos")]
#[command(version)]
struct Args {
    /// Profiles file (recorder.toml)
    #[arg(short, long, global = true)]
    profiles: Option<PathBuf>,

    /// Root folder; recordings default to its recordings/ directory
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured profiles
    List,

    /// Record a profile
    Record {
        profile: String,

        /// Output file or frame directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the profile duration in seconds
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        duration: Option<u64>,
    },

    /// Validate a profile and check its page is reachable
    Check { profile: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cia_recorder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting cia-recorder v{}", env!("CARGO_PKG_VERSION"));

    let profiles_path = resolve_profiles_path(args.profiles.as_deref())
        .context("Cannot locate a profiles file; pass --profiles")?;
    let config = RecorderConfig::load(&profiles_path)?;

    match args.command {
        Commands::List => {
            for name in config.profile_names() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Check { profile } => check(&config, &profile).await,
        Commands::Record {
            profile,
            output,
            duration,
        } => record(&config, &profile, output, duration, args.root_folder).await,
    }
}

async fn check(config: &RecorderConfig, name: &str) -> Result<()> {
    let profile = config.profile(name)?;
    let scratch = scratch_dir();
    let navigator = Navigator::new(profile.fallback_url.clone(), scratch.clone(), &profile.name);

    let outcome = navigator.resolve(&profile.url).await;
    remove_scratch(&scratch).await;
    let outcome = outcome?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if outcome.is_fallback() {
        bail!("Profile '{}' would record a fallback page", profile.name);
    }
    Ok(())
}

async fn record(
    config: &RecorderConfig,
    name: &str,
    output: Option<PathBuf>,
    duration: Option<u64>,
    root_folder: Option<PathBuf>,
) -> Result<()> {
    let mut profile = config.profile(name)?;
    if let Some(secs) = duration {
        profile.duration_secs = secs;
    }

    let output = match output.or_else(|| profile.output.clone()) {
        Some(path) => path,
        None => {
            let app_config = load_toml_config_or_default(resolve_config_path(None).as_deref());
            let root = RootFolderResolver::new("cia-recorder")
                .with_cli(root_folder)
                .with_config(&app_config)
                .resolve();
            let initializer = RootFolderInitializer::new(root);
            initializer
                .ensure_directory_exists()
                .context("Failed to initialize root folder")?;
            profile.default_output(&initializer.recordings_path())
        }
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    info!(
        profile = %profile.name,
        duration_secs = profile.duration_secs,
        interval_ms = profile.frame_interval_ms,
        output = %output.display(),
        "Starting recording"
    );

    let scratch = scratch_dir();
    let sink = build_sink(&profile, &output, &scratch)?;
    let source = build_source(&profile, scratch.clone());

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            info!("Received Ctrl+C, finishing recording");
            cancel.cancel();
        })
    };

    let result = Recorder::new(profile, source, sink).run(cancel).await;
    watcher.abort();

    match result {
        Ok(report) => {
            remove_scratch(&scratch).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(RecorderError::Cancelled) => {
            remove_scratch(&scratch).await;
            warn!("Recording cancelled before any frame was captured");
            Ok(())
        }
        // Scratch kept for inspection
        Err(e) => Err(e).with_context(|| format!("Recording failed (scratch dir {})", scratch.display())),
    }
}

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("cia-recorder-{}", uuid::Uuid::new_v4()))
}

async fn remove_scratch(dir: &Path) {
    if !dir.exists() {
        return;
    }
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        warn!(dir = %dir.display(), error = %e, "Failed to remove scratch dir");
    }
}
