//! Configuration resolution and graceful degradation tests
//!
//! Tests that manipulate CIA_* environment variables are marked #[serial]
//! so they never run in parallel with each other.

use cia_common::config::{
    load_toml_config_or_default, resolve_config_path, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig, ENV_CONFIG, ENV_PROVIDER_API_KEY, ENV_ROOT_FOLDER,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(
        defaults.root_folder.ends_with("enterprise-cia") || defaults.root_folder.ends_with("cia_data"),
        "unexpected default root folder {:?}",
        defaults.root_folder
    );
    assert_eq!(defaults.log_level, "info");
    assert_eq!(defaults.port, 5780);
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ENV_ROOT_FOLDER);

    let root_folder = RootFolderResolver::new("test-module").resolve();
    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_priority_order() {
    env::remove_var(ENV_ROOT_FOLDER);

    let config = TomlConfig::parse("root_folder = \"/tmp/cia-from-toml\"").unwrap();

    // TOML beats compiled default
    let resolved = RootFolderResolver::new("test-module")
        .with_config(&config)
        .resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/cia-from-toml"));

    // ENV beats TOML
    env::set_var(ENV_ROOT_FOLDER, "/tmp/cia-from-env");
    let resolved = RootFolderResolver::new("test-module")
        .with_config(&config)
        .resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/cia-from-env"));

    // CLI beats everything
    let resolved = RootFolderResolver::new("test-module")
        .with_cli(Some(PathBuf::from("/tmp/cia-from-cli")))
        .with_config(&config)
        .resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/cia-from-cli"));

    env::remove_var(ENV_ROOT_FOLDER);
}

#[test]
#[serial]
fn test_config_path_resolution() {
    env::remove_var(ENV_CONFIG);
    let cli = resolve_config_path(Some(Path::new("/etc/cia.toml")));
    assert_eq!(cli, Some(PathBuf::from("/etc/cia.toml")));

    env::set_var(ENV_CONFIG, "/tmp/cia-env.toml");
    assert_eq!(resolve_config_path(None), Some(PathBuf::from("/tmp/cia-env.toml")));
    env::remove_var(ENV_CONFIG);
}

#[test]
fn test_missing_config_file_degrades_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_toml_config_or_default(Some(&dir.path().join("absent.toml")));

    assert!(config.root_folder.is_none());
    assert_eq!(config.port(), CompiledDefaults::for_current_platform().port);
}

#[test]
fn test_malformed_config_file_degrades_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server\nport = ").unwrap();

    let config = load_toml_config_or_default(Some(&path));
    assert!(config.server.port.is_none());
}

#[test]
fn test_valid_config_file_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\nport = 7001\n[database]\nmax_lock_wait_ms = 250\n").unwrap();

    let config = load_toml_config_or_default(Some(&path));
    assert_eq!(config.port(), 7001);
    assert_eq!(config.max_lock_wait_ms(), 250);
}

#[test]
#[serial]
fn test_provider_api_key_env_overrides_toml() {
    let config = TomlConfig::parse("[provider]\napi_key = \"toml-key\"").unwrap();

    env::remove_var(ENV_PROVIDER_API_KEY);
    assert_eq!(config.provider_api_key().as_deref(), Some("toml-key"));

    env::set_var(ENV_PROVIDER_API_KEY, "env-key");
    assert_eq!(config.provider_api_key().as_deref(), Some("env-key"));

    // Blank env value counts as unset
    env::set_var(ENV_PROVIDER_API_KEY, "   ");
    assert_eq!(config.provider_api_key().as_deref(), Some("toml-key"));

    env::remove_var(ENV_PROVIDER_API_KEY);
    assert!(TomlConfig::default().provider_api_key().is_none());
}

#[test]
fn test_initializer_creates_directory_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("cia-root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("cia.db"));
}
