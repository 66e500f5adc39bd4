//! Capture session
//!
//! Drives one recording: preflight navigation, an interval loop of captures,
//! then hand-off to the sink. The source is always closed, whether the loop
//! completed, was cancelled, or aborted after repeated failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Profile;
use crate::error::{RecorderError, Result};
use crate::navigation::NavigationOutcome;
use crate::sink::{CapturedFrame, VideoSink};
use crate::source::FrameSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Ran for the full profile duration
    Completed,
    Cancelled,
    /// Too many consecutive capture failures
    Aborted,
}

/// Summary of a finished recording, written as `<output>.report.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingReport {
    pub profile: String,
    pub frames: usize,
    pub placeholders: usize,
    pub dropped: usize,
    pub output: PathBuf,
    pub elapsed_ms: u64,
    pub navigation: NavigationOutcome,
    pub stop_reason: StopReason,
    pub started_at: DateTime<Utc>,
}

/// Path of the JSON report for a recording at `output`
pub fn report_path(output: &Path) -> PathBuf {
    let name = if output.is_dir() {
        output.file_name()
    } else {
        output.file_stem()
    };
    let name = name
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());
    output.with_file_name(format!("{}.report.json", name))
}

pub async fn write_report(report: &RecordingReport) -> Result<PathBuf> {
    let path = report_path(&report.output);
    let json = serde_json::to_vec_pretty(report)
        .map_err(|e| RecorderError::Encode(format!("Failed to serialize report: {}", e)))?;
    tokio::fs::write(&path, json).await?;
    Ok(path)
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    frames: usize,
    placeholders: usize,
    dropped: usize,
    consecutive_failures: u32,
}

pub struct Recorder {
    profile: Profile,
    source: Box<dyn FrameSource>,
    sink: Box<dyn VideoSink>,
}

impl Recorder {
    pub fn new(profile: Profile, source: Box<dyn FrameSource>, sink: Box<dyn VideoSink>) -> Self {
        Self { profile, source, sink }
    }

    /// Record until the profile duration elapses or `cancel` fires.
    ///
    /// Returns `Cancelled` if stopped before the first frame, and `Capture` if
    /// no frame could be captured at all. Otherwise the sink is finished with
    /// whatever was captured and the report is written next to the output.
    pub async fn run(self, cancel: CancellationToken) -> Result<RecordingReport> {
        let Recorder {
            profile,
            mut source,
            mut sink,
        } = self;

        let started_at = Utc::now();
        let started = Instant::now();

        let navigation = match source.prepare(&profile.url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };
        match &navigation {
            NavigationOutcome::Primary { url } => info!(profile = %profile.name, url = %url, "Recording"),
            NavigationOutcome::Fallback { url, reason } => warn!(
                profile = %profile.name,
                requested = %profile.url,
                url = %url,
                reason = %reason,
                "Target unavailable, recording fallback page"
            ),
        }

        let (tally, stop_reason) = capture_loop(&profile, source.as_mut(), sink.as_mut(), &cancel).await;
        source.close().await;

        if tally.frames == 0 {
            return Err(match stop_reason {
                StopReason::Cancelled => RecorderError::Cancelled,
                _ => RecorderError::Capture(format!(
                    "No frames captured for profile '{}' ({} dropped)",
                    profile.name, tally.dropped
                )),
            });
        }

        let output = sink.finish().await?;

        let report = RecordingReport {
            profile: profile.name.clone(),
            frames: tally.frames,
            placeholders: tally.placeholders,
            dropped: tally.dropped,
            output,
            elapsed_ms: started.elapsed().as_millis() as u64,
            navigation,
            stop_reason,
            started_at,
        };

        let report_file = write_report(&report).await?;
        info!(
            profile = %report.profile,
            frames = report.frames,
            placeholders = report.placeholders,
            dropped = report.dropped,
            stop_reason = ?report.stop_reason,
            output = %report.output.display(),
            report = %report_file.display(),
            "Recording finished"
        );

        Ok(report)
    }
}

async fn capture_loop(
    profile: &Profile,
    source: &mut dyn FrameSource,
    sink: &mut dyn VideoSink,
    cancel: &CancellationToken,
) -> (Tally, StopReason) {
    let deadline = tokio::time::Instant::now() + profile.duration();
    let mut interval = tokio::time::interval(profile.frame_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut tally = Tally::default();
    let mut last_good: Option<PathBuf> = None;

    let mut stop_reason = StopReason::Completed;

    // tick_count() bounds the loop; the deadline ends it when captures run slow
    for tick in 0..profile.tick_count() {
        let stop = tokio::select! {
            biased;
            _ = cancel.cancelled() => Some(StopReason::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Some(StopReason::Completed),
            _ = interval.tick() => None,
        };
        if let Some(reason) = stop {
            stop_reason = reason;
            break;
        }

        let index = tally.frames;
        let dest = sink.frame_path(index);

        let captured = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StopReason::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(StopReason::Completed),
            result = source.capture(&dest) => Ok(result),
        };
        let captured = match captured {
            Ok(result) => result,
            Err(reason) => {
                stop_reason = reason;
                break;
            }
        };

        let stored = match captured {
            Ok(()) => {
                tally.consecutive_failures = 0;
                let stored = sink
                    .accept(CapturedFrame {
                        index,
                        path: dest.clone(),
                        placeholder: false,
                    })
                    .await;
                if stored.is_ok() {
                    tally.frames += 1;
                    last_good = Some(dest);
                    debug!(tick, index, "Captured frame");
                }
                stored
            }
            Err(e) => {
                tally.consecutive_failures += 1;
                warn!(
                    tick,
                    failures = tally.consecutive_failures,
                    error = %e,
                    "Frame capture failed"
                );
                if tally.consecutive_failures > profile.max_consecutive_failures {
                    warn!(
                        profile = %profile.name,
                        limit = profile.max_consecutive_failures,
                        "Too many consecutive capture failures, stopping"
                    );
                    stop_reason = StopReason::Aborted;
                    break;
                }

                match &last_good {
                    Some(previous) => {
                        let stored = store_placeholder(sink, previous, index, dest).await;
                        if stored.is_ok() {
                            tally.frames += 1;
                            tally.placeholders += 1;
                        }
                        stored
                    }
                    None => {
                        tally.dropped += 1;
                        Ok(())
                    }
                }
            }
        };

        // Frames already handed to the sink are still finished
        if let Err(e) = stored {
            warn!(tick, index, error = %e, "Failed to store frame, stopping");
            stop_reason = StopReason::Aborted;
            break;
        }
    }

    // An interrupted or failed capture may leave a partial file in the next slot
    let stray = sink.frame_path(tally.frames);
    if tokio::fs::try_exists(&stray).await.unwrap_or(false) {
        if let Err(e) = tokio::fs::remove_file(&stray).await {
            warn!(path = %stray.display(), error = %e, "Failed to remove partial frame");
        }
    }

    (tally, stop_reason)
}

/// Copy the last good frame into slot `index` and hand it to the sink
async fn store_placeholder(
    sink: &mut dyn VideoSink,
    previous: &Path,
    index: usize,
    dest: PathBuf,
) -> Result<()> {
    tokio::fs::copy(previous, &dest).await?;
    sink.accept(CapturedFrame {
        index,
        path: dest,
        placeholder: true,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_path_for_video_file() {
        assert_eq!(
            report_path(Path::new("/rec/dashboard.mp4")),
            PathBuf::from("/rec/dashboard.report.json")
        );
    }

    #[test]
    fn test_report_path_for_frame_dir() {
        let dir = tempfile::tempdir().unwrap();
        let frames = dir.path().join("cards-frames");
        std::fs::create_dir_all(&frames).unwrap();
        assert_eq!(report_path(&frames), dir.path().join("cards-frames.report.json"));
    }

    #[test]
    fn test_report_serializes_snake_case() {
        let report = RecordingReport {
            profile: "demo".to_string(),
            frames: 3,
            placeholders: 1,
            dropped: 0,
            output: PathBuf::from("/rec/demo.mp4"),
            elapsed_ms: 1500,
            navigation: NavigationOutcome::Primary {
                url: "http://localhost:3000".to_string(),
            },
            stop_reason: StopReason::Cancelled,
            started_at: Utc::now(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stop_reason"], "cancelled");
        assert_eq!(json["navigation"]["kind"], "primary");
    }
}
