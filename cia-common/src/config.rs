//! Configuration loading and root folder resolution
//!
//! Configuration is layered. For every setting the priority order is:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or malformed TOML file never stops a service from starting:
//! a warning is logged and compiled defaults are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "enterprise-cia";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "cia.db";

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "CIA_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const ENV_CONFIG: &str = "CIA_CONFIG";

/// Environment variable carrying the provider API key
pub const ENV_PROVIDER_API_KEY: &str = "CIA_PROVIDER_API_KEY";

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub provider_base_url: String,
    pub provider_timeout_secs: u64,
    pub provider_min_interval_ms: u64,
    pub refresh_interval_secs: u64,
    pub max_lock_wait_ms: u64,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./cia_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5780,
            provider_base_url: "https://api.ydc-index.io".to_string(),
            provider_timeout_secs: 60,
            provider_min_interval_ms: 250,
            refresh_interval_secs: 900,
            max_lock_wait_ms: 5000,
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// `[provider]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub min_interval_ms: Option<u64>,
}

/// `[scheduler]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerSection {
    pub enabled: Option<bool>,
    pub refresh_interval_secs: Option<u64>,
}

/// `[database]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub max_lock_wait_ms: Option<u64>,
}

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub database: DatabaseSection,
}

impl TomlConfig {
    /// Parse a config file. Errors on missing file or invalid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    pub fn log_level(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().log_level)
    }

    pub fn host(&self) -> String {
        self.server
            .host
            .clone()
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().host)
    }

    pub fn port(&self) -> u16 {
        self.server
            .port
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().port)
    }

    pub fn provider_base_url(&self) -> String {
        self.provider
            .base_url
            .clone()
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().provider_base_url)
    }

    pub fn provider_timeout_secs(&self) -> u64 {
        self.provider
            .timeout_secs
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().provider_timeout_secs)
    }

    pub fn provider_min_interval_ms(&self) -> u64 {
        self.provider
            .min_interval_ms
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().provider_min_interval_ms)
    }

    pub fn scheduler_enabled(&self) -> bool {
        self.scheduler.enabled.unwrap_or(true)
    }

    pub fn refresh_interval_secs(&self) -> u64 {
        self.scheduler
            .refresh_interval_secs
            .filter(|secs| *secs > 0)
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().refresh_interval_secs)
    }

    pub fn max_lock_wait_ms(&self) -> u64 {
        self.database
            .max_lock_wait_ms
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().max_lock_wait_ms)
    }

    /// Provider API key: environment wins over TOML. Blank values count as unset.
    pub fn provider_api_key(&self) -> Option<String> {
        let env_key = std::env::var(ENV_PROVIDER_API_KEY)
            .ok()
            .filter(|k| !k.trim().is_empty());
        let toml_key = self
            .provider
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty());

        if env_key.is_some() && toml_key.is_some() {
            warn!(
                "Provider API key found in both {} and TOML config. Using environment.",
                ENV_PROVIDER_API_KEY
            );
        }

        env_key.or(toml_key)
    }
}

/// Locate the config file: CLI → `CIA_CONFIG` → platform config dir
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Load the config file, degrading to defaults on any problem
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        warn!("No config file location available, using compiled defaults");
        return TomlConfig::default();
    };

    if !path.exists() {
        warn!(
            "Config file not found at {}, using compiled defaults",
            path.display()
        );
        return TomlConfig::default();
    }

    match TomlConfig::load(path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!(
                "Failed to load config file {}: {}. Using compiled defaults",
                path.display(),
                e
            );
            TomlConfig::default()
        }
    }
}

/// Root folder resolution following the CLI → ENV → TOML → default order
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn with_config(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ENV_ROOT_FOLDER);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return path.clone();
        }

        debug!(module = %self.module_name, "Root folder from compiled default");
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout and hands out well-known paths inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn recordings_path(&self) -> PathBuf {
        self.root_folder.join("recordings")
    }
}
