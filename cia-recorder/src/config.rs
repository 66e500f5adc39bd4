//! Recording profiles
//!
//! Profiles live in a TOML file. `[defaults]` supplies values for any field a
//! `[[profile]]` table leaves out:
//!
//! ```toml
//! [defaults]
//! frame_interval_ms = 500
//! duration_secs = 30
//! viewport = { width = 1920, height = 1080 }
//! source = { kind = "headless_browser", binary = "chromium" }
//! sink = { kind = "ffmpeg", container = "mp4" }
//!
//! [[profile]]
//! name = "dashboard"
//! url = "http://localhost:3000/dashboard"
//! fallback_url = "http://localhost:3000"
//! duration_secs = 45
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RecorderError, Result};

/// Profiles file override
pub const ENV_PROFILES: &str = "CIA_RECORDER_PROFILES";

/// Profiles file name inside the platform config dir
pub const PROFILES_FILE_NAME: &str = "recorder.toml";

pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 500;
pub const DEFAULT_DURATION_SECS: u64 = 30;
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;
pub const DEFAULT_BROWSER: &str = "chromium";
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

fn default_browser() -> String {
    DEFAULT_BROWSER.to_string()
}

fn default_ffmpeg() -> String {
    DEFAULT_FFMPEG.to_string()
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// One `--headless --screenshot` browser invocation per frame
    HeadlessBrowser {
        #[serde(default = "default_browser")]
        binary: String,
        #[serde(default)]
        extra_args: Vec<String>,
    },
    /// Any external capture command. Args may use `{output}`, `{url}`,
    /// `{width}` and `{height}`.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::HeadlessBrowser {
            binary: default_browser(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Webm,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Webm => "webm",
        }
    }
}

/// Where frames go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Encode to a video file
    Ffmpeg {
        #[serde(default = "default_ffmpeg")]
        binary: String,
        #[serde(default)]
        container: Container,
    },
    /// Keep the numbered frames in a directory with a manifest
    Frames,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Ffmpeg {
            binary: default_ffmpeg(),
            container: Container::default(),
        }
    }
}

/// `[defaults]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDefaults {
    pub frame_interval_ms: Option<u64>,
    pub duration_secs: Option<u64>,
    pub viewport: Option<Viewport>,
    pub max_consecutive_failures: Option<u32>,
    pub source: Option<SourceConfig>,
    pub sink: Option<SinkConfig>,
}

/// One `[[profile]]` table as written
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileEntry {
    pub name: String,
    pub url: String,
    pub fallback_url: Option<String>,
    pub frame_interval_ms: Option<u64>,
    pub duration_secs: Option<u64>,
    pub viewport: Option<Viewport>,
    pub max_consecutive_failures: Option<u32>,
    pub output: Option<PathBuf>,
    pub source: Option<SourceConfig>,
    pub sink: Option<SinkConfig>,
}

/// A profile with defaults applied and validated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub url: String,
    pub fallback_url: Option<String>,
    pub frame_interval_ms: u64,
    pub duration_secs: u64,
    pub viewport: Viewport,
    pub max_consecutive_failures: u32,
    pub output: Option<PathBuf>,
    pub source: SourceConfig,
    pub sink: SinkConfig,
}

impl Profile {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Capture ticks in a full-length recording (at least one)
    pub fn tick_count(&self) -> u64 {
        let total_ms = self.duration_secs.saturating_mul(1000);
        total_ms.div_ceil(self.frame_interval_ms).max(1)
    }

    /// Frames per second implied by the capture interval
    pub fn frame_rate(&self) -> f64 {
        1000.0 / self.frame_interval_ms as f64
    }

    /// Output path used when neither the CLI nor the profile names one
    pub fn default_output(&self, recordings_dir: &Path) -> PathBuf {
        match &self.sink {
            SinkConfig::Ffmpeg { container, .. } => {
                recordings_dir.join(format!("{}.{}", self.name, container.extension()))
            }
            SinkConfig::Frames => recordings_dir.join(format!("{}-frames", self.name)),
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(RecorderError::Config(format!("Profile '{}': {}", self.name, msg)));

        if self.url.trim().is_empty() {
            return invalid("url must not be empty");
        }
        if self.frame_interval_ms == 0 {
            return invalid("frame_interval_ms must be greater than 0");
        }
        if self.duration_secs == 0 {
            return invalid("duration_secs must be greater than 0");
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return invalid("viewport width and height must be non-zero");
        }
        if self.max_consecutive_failures == 0 {
            return invalid("max_consecutive_failures must be greater than 0");
        }
        match &self.source {
            SourceConfig::HeadlessBrowser { binary, .. } if binary.trim().is_empty() => {
                return invalid("browser binary must not be empty");
            }
            SourceConfig::Command { program, args } => {
                if program.trim().is_empty() {
                    return invalid("command program must not be empty");
                }
                if !args.iter().any(|a| a.contains("{output}")) {
                    return invalid("command args must reference {output}");
                }
            }
            _ => {}
        }
        if let SinkConfig::Ffmpeg { binary, .. } = &self.sink {
            if binary.trim().is_empty() {
                return invalid("ffmpeg binary must not be empty");
            }
        }
        Ok(())
    }
}

/// Parsed profiles file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecorderConfig {
    #[serde(default)]
    pub defaults: ProfileDefaults,
    #[serde(default, rename = "profile")]
    pub profiles: Vec<ProfileEntry>,
}

impl RecorderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecorderError::Config(format!("Cannot read profiles file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse and validate every profile
    pub fn parse(content: &str) -> Result<Self> {
        let config: RecorderConfig = toml::from_str(content)
            .map_err(|e| RecorderError::Config(format!("Invalid profiles TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.profiles {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(RecorderError::Config("Profile name must not be empty".to_string()));
            }
            if !seen.insert(name.to_string()) {
                return Err(RecorderError::Config(format!("Duplicate profile name: {}", name)));
            }
            self.resolve(entry).validate()?;
        }
        Ok(())
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.trim()).collect()
    }

    /// Look up a profile by name with defaults merged in
    pub fn profile(&self, name: &str) -> Result<Profile> {
        let entry = self
            .profiles
            .iter()
            .find(|p| p.name.trim() == name.trim())
            .ok_or_else(|| RecorderError::Config(format!("Unknown profile: {}", name)))?;
        let profile = self.resolve(entry);
        profile.validate()?;
        Ok(profile)
    }

    fn resolve(&self, entry: &ProfileEntry) -> Profile {
        let d = &self.defaults;
        Profile {
            name: entry.name.trim().to_string(),
            url: entry.url.trim().to_string(),
            fallback_url: entry
                .fallback_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            frame_interval_ms: entry
                .frame_interval_ms
                .or(d.frame_interval_ms)
                .unwrap_or(DEFAULT_FRAME_INTERVAL_MS),
            duration_secs: entry
                .duration_secs
                .or(d.duration_secs)
                .unwrap_or(DEFAULT_DURATION_SECS),
            viewport: entry.viewport.or(d.viewport).unwrap_or_default(),
            max_consecutive_failures: entry
                .max_consecutive_failures
                .or(d.max_consecutive_failures)
                .unwrap_or(DEFAULT_MAX_CONSECUTIVE_FAILURES),
            output: entry.output.clone(),
            source: entry.source.clone().or_else(|| d.source.clone()).unwrap_or_default(),
            sink: entry.sink.clone().or_else(|| d.sink.clone()).unwrap_or_default(),
        }
    }
}

/// Locate the profiles file: CLI → `CIA_RECORDER_PROFILES` → platform config dir
pub fn resolve_profiles_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_PROFILES) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| {
        d.join(cia_common::config::APP_DIR_NAME)
            .join(PROFILES_FILE_NAME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [defaults]
        frame_interval_ms = 250
        viewport = { width = 1280, height = 720 }
        sink = { kind = "ffmpeg", container = "webm" }

        [[profile]]
        name = "dashboard"
        url = "http://localhost:3000/dashboard"
        fallback_url = "http://localhost:3000"
        duration_secs = 10

        [[profile]]
        name = "cards"
        url = "http://localhost:3000/cards"
        frame_interval_ms = 1000
        source = { kind = "command", program = "grim", args = ["-g", "0,0 {width}x{height}", "{output}"] }
        sink = { kind = "frames" }
    "#;

    #[test]
    fn test_defaults_merge_into_profiles() {
        let config = RecorderConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.profile_names(), vec!["dashboard", "cards"]);

        let dashboard = config.profile("dashboard").unwrap();
        assert_eq!(dashboard.frame_interval_ms, 250);
        assert_eq!(dashboard.duration_secs, 10);
        assert_eq!(dashboard.viewport, Viewport { width: 1280, height: 720 });
        assert_eq!(dashboard.max_consecutive_failures, DEFAULT_MAX_CONSECUTIVE_FAILURES);
        assert_eq!(dashboard.source, SourceConfig::default());
        assert_eq!(
            dashboard.sink,
            SinkConfig::Ffmpeg {
                binary: "ffmpeg".to_string(),
                container: Container::Webm
            }
        );
        assert_eq!(dashboard.tick_count(), 40);
        assert_eq!(dashboard.frame_rate(), 4.0);

        let cards = config.profile("cards").unwrap();
        assert_eq!(cards.frame_interval_ms, 1000);
        assert_eq!(cards.duration_secs, DEFAULT_DURATION_SECS);
        assert_eq!(cards.sink, SinkConfig::Frames);
    }

    #[test]
    fn test_default_output_paths() {
        let config = RecorderConfig::parse(SAMPLE).unwrap();
        let dir = Path::new("/rec");
        assert_eq!(
            config.profile("dashboard").unwrap().default_output(dir),
            PathBuf::from("/rec/dashboard.webm")
        );
        assert_eq!(
            config.profile("cards").unwrap().default_output(dir),
            PathBuf::from("/rec/cards-frames")
        );
    }

    #[test]
    fn test_tick_count_rounds_up() {
        let mut profile = RecorderConfig::parse(SAMPLE).unwrap().profile("dashboard").unwrap();
        profile.duration_secs = 1;
        profile.frame_interval_ms = 300;
        assert_eq!(profile.tick_count(), 4);
    }

    #[test]
    fn test_unknown_profile() {
        let config = RecorderConfig::parse(SAMPLE).unwrap();
        assert!(matches!(config.profile("nope"), Err(RecorderError::Config(_))));
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            r#"[[profile]]
               name = "a"
               url = "  ""#,
            r#"[[profile]]
               name = "a"
               url = "http://x"
               frame_interval_ms = 0"#,
            r#"[[profile]]
               name = "a"
               url = "http://x"
               duration_secs = 0"#,
            r#"[[profile]]
               name = "a"
               url = "http://x"
               viewport = { width = 0, height = 10 }"#,
            r#"[[profile]]
               name = "a"
               url = "http://x"
               [[profile]]
               name = "a"
               url = "http://y""#,
            r#"[[profile]]
               name = "a"
               url = "http://x"
               source = { kind = "command", program = "shot", args = ["out.png"] }"#,
            r#"[[profile]]
               name = "a"
               url = "http://x"
               colour = "blue""#,
        ];

        for case in cases {
            assert!(
                matches!(RecorderConfig::parse(case), Err(RecorderError::Config(_))),
                "expected config error for:\n{}",
                case
            );
        }
    }
}
