//! Frame directory output

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{frame_file_name, CapturedFrame, VideoSink};
use crate::error::{RecorderError, Result};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index: usize,
    pub file: String,
    pub placeholder: bool,
}

/// Written next to the frames as `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameManifest {
    pub profile: String,
    pub frame_interval_ms: u64,
    pub frames: Vec<ManifestEntry>,
    pub created_at: DateTime<Utc>,
}

/// Keeps numbered PNG frames in `dir`
pub struct FrameDirSink {
    dir: PathBuf,
    profile: String,
    frame_interval_ms: u64,
    entries: Vec<ManifestEntry>,
}

impl FrameDirSink {
    pub fn new(dir: PathBuf, profile: &str, frame_interval_ms: u64) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            profile: profile.to_string(),
            frame_interval_ms,
            entries: Vec::new(),
        })
    }
}

#[async_trait]
impl VideoSink for FrameDirSink {
    fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(frame_file_name(index))
    }

    async fn accept(&mut self, frame: CapturedFrame) -> Result<()> {
        self.entries.push(ManifestEntry {
            index: frame.index,
            file: frame_file_name(frame.index),
            placeholder: frame.placeholder,
        });
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<PathBuf> {
        let manifest = FrameManifest {
            profile: self.profile,
            frame_interval_ms: self.frame_interval_ms,
            frames: self.entries,
            created_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| RecorderError::Encode(format!("Failed to serialize manifest: {}", e)))?;
        tokio::fs::write(self.dir.join(MANIFEST_FILE_NAME), json).await?;

        tracing::info!(
            frames = manifest.frames.len(),
            dir = %self.dir.display(),
            "Frames written"
        );
        Ok(self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manifest_lists_frames() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames");
        let mut sink = FrameDirSink::new(out.clone(), "demo", 500).unwrap();

        for (index, placeholder) in [(0, false), (1, true)] {
            sink.accept(CapturedFrame {
                index,
                path: sink.frame_path(index),
                placeholder,
            })
            .await
            .unwrap();
        }

        let result = Box::new(sink).finish().await.unwrap();
        assert_eq!(result, out);

        let manifest: FrameManifest =
            serde_json::from_slice(&std::fs::read(out.join(MANIFEST_FILE_NAME)).unwrap()).unwrap();
        assert_eq!(manifest.profile, "demo");
        assert_eq!(manifest.frames.len(), 2);
        assert_eq!(manifest.frames[1].file, "frame_00001.png");
        assert!(manifest.frames[1].placeholder);
    }
}
