//! Video sinks
//!
//! A [`VideoSink`] decides where numbered frames are written and what the
//! finished recording is. Frames are numbered contiguously from zero.

mod ffmpeg;
mod frames;

pub use ffmpeg::{encoder_args, FfmpegSink};
pub use frames::{FrameDirSink, FrameManifest, MANIFEST_FILE_NAME};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::{Profile, SinkConfig};
use crate::error::Result;

/// printf-style pattern matching [`frame_file_name`]
pub const FRAME_PATTERN: &str = "frame_%05d.png";

pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:05}.png", index)
}

/// A frame already on disk at the sink's `frame_path(index)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub index: usize,
    pub path: PathBuf,
    /// Copy of the previous good frame standing in for a failed capture
    pub placeholder: bool,
}

#[async_trait]
pub trait VideoSink: Send {
    /// Where frame `index` must be written
    fn frame_path(&self, index: usize) -> PathBuf;

    /// Register a frame written to `frame_path(frame.index)`
    async fn accept(&mut self, frame: CapturedFrame) -> Result<()>;

    /// Produce the final artifact and return its path
    async fn finish(self: Box<Self>) -> Result<PathBuf>;
}

/// Build the sink a profile asks for. Encoded sinks stage frames in a fresh
/// directory under `scratch_root`.
pub fn build_sink(profile: &Profile, output: &Path, scratch_root: &Path) -> Result<Box<dyn VideoSink>> {
    match &profile.sink {
        SinkConfig::Ffmpeg { binary, container } => {
            let work_dir = scratch_root.join(format!("{}-{}", profile.name, uuid::Uuid::new_v4()));
            Ok(Box::new(FfmpegSink::new(
                binary.clone(),
                *container,
                work_dir,
                output.to_path_buf(),
                profile.frame_rate(),
            )?))
        }
        SinkConfig::Frames => Ok(Box::new(FrameDirSink::new(
            output.to_path_buf(),
            &profile.name,
            profile.frame_interval_ms,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_file_name_matches_pattern() {
        assert_eq!(frame_file_name(0), "frame_00000.png");
        assert_eq!(frame_file_name(123), "frame_00123.png");
        assert_eq!(FRAME_PATTERN.replace("%05d", "00123"), frame_file_name(123));
    }
}
