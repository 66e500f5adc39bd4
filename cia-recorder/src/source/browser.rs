//! Headless browser screenshots

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use super::{run_capture, FrameSource};
use crate::config::Viewport;
use crate::error::{RecorderError, Result};
use crate::navigation::{NavigationOutcome, Navigator};

/// Captures each frame with a fresh `--headless --screenshot` browser run
pub struct HeadlessBrowserSource {
    binary: String,
    extra_args: Vec<String>,
    viewport: Viewport,
    navigator: Navigator,
    url: Option<String>,
}

impl HeadlessBrowserSource {
    pub fn new(binary: String, extra_args: Vec<String>, viewport: Viewport, navigator: Navigator) -> Self {
        Self {
            binary,
            extra_args,
            viewport,
            navigator,
            url: None,
        }
    }

    /// Browser arguments for one screenshot of `url` into `dest`
    pub fn screenshot_args(&self, url: &str, dest: &Path) -> Vec<String> {
        let mut args = vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            format!("--window-size={},{}", self.viewport.width, self.viewport.height),
            format!("--screenshot={}", dest.display()),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl FrameSource for HeadlessBrowserSource {
    async fn prepare(&mut self, url: &str) -> Result<NavigationOutcome> {
        let outcome = self.navigator.resolve(url).await?;
        self.url = Some(outcome.url().to_string());
        Ok(outcome)
    }

    async fn capture(&mut self, dest: &Path) -> Result<()> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| RecorderError::Capture("capture before prepare".to_string()))?;

        let mut command = Command::new(&self.binary);
        command.args(self.screenshot_args(url, dest));
        run_capture(command, &self.binary, dest).await
    }

    async fn close(&mut self) {
        self.url = None;
    }
}
