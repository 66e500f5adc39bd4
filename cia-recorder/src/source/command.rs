//! Templated external capture command

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

use super::{run_capture, FrameSource};
use crate::config::Viewport;
use crate::error::{RecorderError, Result};
use crate::navigation::{NavigationOutcome, Navigator};

/// Runs a user-supplied command per frame. `{output}`, `{url}`, `{width}`
/// and `{height}` in the arguments are substituted before each run.
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    viewport: Viewport,
    navigator: Navigator,
    url: Option<String>,
}

impl CommandSource {
    pub fn new(program: String, args: Vec<String>, viewport: Viewport, navigator: Navigator) -> Self {
        Self {
            program,
            args,
            viewport,
            navigator,
            url: None,
        }
    }

    pub fn expand_args(&self, url: &str, dest: &Path) -> Vec<String> {
        let output = dest.display().to_string();
        let width = self.viewport.width.to_string();
        let height = self.viewport.height.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{output}", &output)
                    .replace("{url}", url)
                    .replace("{width}", &width)
                    .replace("{height}", &height)
            })
            .collect()
    }
}

#[async_trait]
impl FrameSource for CommandSource {
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

        let mut command = Command::new(&self.program);
        command.args(self.expand_args(url, dest));
        run_capture(command, &self.program, dest).await
    }

    async fn close(&mut self) {
        self.url = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source(program: &str, args: &[&str]) -> CommandSource {
        CommandSource::new(
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
            Viewport { width: 800, height: 600 },
            Navigator::new(None, std::env::temp_dir(), "demo"),
        )
    }

    #[test]
    fn test_expand_args() {
        let source = source("grim", &["-g", "0,0 {width}x{height}", "--url={url}", "{output}"]);
        let args = source.expand_args("http://x", Path::new("/f/frame_00000.png"));
        assert_eq!(args, vec!["-g", "0,0 800x600", "--url=http://x", "/f/frame_00000.png"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let dest: PathBuf = dir.path().join("frame.png");

        let mut source = source("sh", &["-c", "printf png > \"$0\"", "{output}"]);
        source.prepare("about:blank").await.unwrap();
        source.capture(&dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"png");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_or_empty_capture_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("frame.png");

        let mut failing = source("sh", &["-c", "echo boom >&2; exit 3", "{output}"]);
        failing.prepare("about:blank").await.unwrap();
        match failing.capture(&dest).await {
            Err(RecorderError::Capture(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected {:?}", other),
        }

        let mut silent = source("sh", &["-c", "true", "{output}"]);
        silent.prepare("about:blank").await.unwrap();
        assert!(matches!(silent.capture(&dest).await, Err(RecorderError::Capture(_))));
    }
}
