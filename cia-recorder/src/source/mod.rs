//! Frame sources
//!
//! A [`FrameSource`] knows how to put one image of the page on disk. The
//! session calls `prepare` once, `capture` on every tick, and `close` at the
//! end regardless of how the recording stopped.

mod browser;
mod command;

pub use browser::HeadlessBrowserSource;
pub use command::CommandSource;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::{Profile, SourceConfig};
use crate::error::{RecorderError, Result};
use crate::navigation::{NavigationOutcome, Navigator};

/// Upper bound on a single capture command
pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait FrameSource: Send {
    /// Check the target page and settle on the URL to capture
    async fn prepare(&mut self, url: &str) -> Result<NavigationOutcome>;

    /// Write one image to `dest`
    async fn capture(&mut self, dest: &Path) -> Result<()>;

    /// Release anything held by the source
    async fn close(&mut self);
}

/// Build the source a profile asks for. `work_dir` holds scratch files such
/// as the placeholder page.
pub fn build_source(profile: &Profile, work_dir: PathBuf) -> Box<dyn FrameSource> {
    let navigator = Navigator::new(profile.fallback_url.clone(), work_dir, &profile.name);
    match &profile.source {
        SourceConfig::HeadlessBrowser { binary, extra_args } => Box::new(HeadlessBrowserSource::new(
            binary.clone(),
            extra_args.clone(),
            profile.viewport,
            navigator,
        )),
        SourceConfig::Command { program, args } => Box::new(CommandSource::new(
            program.clone(),
            args.clone(),
            profile.viewport,
            navigator,
        )),
    }
}

/// Run a capture command and confirm it produced a non-empty image at `dest`
pub(crate) async fn run_capture(mut command: Command, program: &str, dest: &Path) -> Result<()> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = tokio::time::timeout(CAPTURE_TIMEOUT, command.output())
        .await
        .map_err(|_| {
            RecorderError::Capture(format!("{} timed out after {:?}", program, CAPTURE_TIMEOUT))
        })?
        .map_err(|e| RecorderError::Capture(format!("Failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RecorderError::Capture(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    match tokio::fs::metadata(dest).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(RecorderError::Capture(format!(
            "{} produced no image at {}",
            program,
            dest.display()
        ))),
    }
}
