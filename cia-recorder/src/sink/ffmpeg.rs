//! ffmpeg-encoded recordings

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{frame_file_name, CapturedFrame, VideoSink, FRAME_PATTERN};
use crate::config::Container;
use crate::error::{RecorderError, Result};

/// Lines of encoder stderr kept in an `Encode` error
const STDERR_TAIL_LINES: usize = 20;

/// Fixed encoder argument list for an image sequence
pub fn encoder_args(container: Container, frame_rate: f64, input_pattern: &Path, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-framerate".into(),
        format!("{}", frame_rate),
        "-i".into(),
        input_pattern.display().to_string(),
    ];

    let codec: &[&str] = match container {
        // H.264 needs even dimensions
        Container::Mp4 => &[
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-vf",
            "scale=trunc(iw/2)*2:trunc(ih/2)*2",
            "-movflags",
            "+faststart",
        ],
        Container::Webm => &["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p", "-b:v", "0", "-crf", "32"],
    };
    args.extend(codec.iter().map(|s| s.to_string()));
    args.push(output.display().to_string());
    args
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Stages PNG frames in a work directory and encodes them on finish
pub struct FfmpegSink {
    binary: String,
    container: Container,
    work_dir: PathBuf,
    output: PathBuf,
    frame_rate: f64,
    frames: usize,
}

impl FfmpegSink {
    pub fn new(
        binary: String,
        container: Container,
        work_dir: PathBuf,
        output: PathBuf,
        frame_rate: f64,
    ) -> Result<Self> {
        std::fs::create_dir_all(&work_dir)?;
        Ok(Self {
            binary,
            container,
            work_dir,
            output,
            frame_rate,
            frames: 0,
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

#[async_trait]
impl VideoSink for FfmpegSink {
    fn frame_path(&self, index: usize) -> PathBuf {
        self.work_dir.join(frame_file_name(index))
    }

    async fn accept(&mut self, frame: CapturedFrame) -> Result<()> {
        if frame.index != self.frames {
            return Err(RecorderError::Encode(format!(
                "Frame {} out of sequence (expected {})",
                frame.index, self.frames
            )));
        }
        self.frames += 1;
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<PathBuf> {
        if self.frames == 0 {
            return Err(RecorderError::Encode("No frames to encode".to_string()));
        }

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = encoder_args(
            self.container,
            self.frame_rate,
            &self.work_dir.join(FRAME_PATTERN),
            &self.output,
        );

        tracing::info!(
            frames = self.frames,
            output = %self.output.display(),
            container = self.container.extension(),
            "Encoding recording"
        );

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RecorderError::Encode(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            // Frames stay in the work dir for inspection
            return Err(RecorderError::Encode(format!(
                "{} exited with {} (frames kept in {}): {}",
                self.binary,
                output.status,
                self.work_dir.display(),
                stderr_tail(&output.stderr)
            )));
        }

        if let Err(e) = tokio::fs::remove_dir_all(&self.work_dir).await {
            tracing::warn!(dir = %self.work_dir.display(), error = %e, "Failed to remove frame work dir");
        }

        Ok(self.output)
    }
}
