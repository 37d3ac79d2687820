//! Configuration file loading tests
//!
//! Tests that touch XDG_CONFIG_HOME are marked #[serial] so they never
//! observe each other's environment.

use sanctum_common::config::{BlobBackend, Overrides, RunMode, Settings, TomlConfig};
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
mode = "production"

[server]
bind = "0.0.0.0:8080"
request_timeout_secs = 10

[database]
url = "sqlite:///var/lib/sanctum/sanctum.db"
max_connections = 4

[auth]
token_secret = "0123456789abcdef0123456789abcdef"
hash_memory_kib = 4096
hash_iterations = 3

[blob]
backend = "http"
endpoint = "https://blobs.example.com"
write_token = "write-me"
public_base_url = "https://cdn.example.com/"

[logging]
level = "debug"
"#;

#[test]
fn test_full_file_parses() {
    let toml = TomlConfig::parse(FULL_CONFIG).unwrap();
    let settings = Settings::resolve(Overrides::default(), toml, &PathBuf::from("/unused")).unwrap();

    assert_eq!(settings.mode, RunMode::Production);
    assert_eq!(settings.bind, "0.0.0.0:8080");
    assert_eq!(settings.max_connections, 4);
    assert_eq!(settings.hash_cost.memory_kib, 4096);
    assert_eq!(settings.hash_cost.iterations, 3);
    assert_eq!(settings.blob.backend, BlobBackend::Http);
    assert_eq!(settings.blob.public_base_url, "https://cdn.example.com");
    assert_eq!(settings.blob.write_token.as_ref().unwrap().expose(), "write-me");
    assert_eq!(settings.log_level, "debug");
}

#[test]
fn test_explicit_config_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sanctum.toml");
    std::fs::write(&path, "[server]\nbind = \"127.0.0.1:6001\"\n").unwrap();

    let settings = Settings::load(Overrides {
        config_path: Some(path),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(settings.bind, "127.0.0.1:6001");
    assert_eq!(settings.mode, RunMode::Development);
}

#[test]
fn test_missing_file_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let loaded = TomlConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert!(loaded.mode.is_none());
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "mode = [unclosed").unwrap();

    assert!(TomlConfig::load(&path).is_err());
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_platform_config_file_is_used() {
    let dir = TempDir::new().unwrap();
    let app_dir = dir.path().join("sanctum");
    std::fs::create_dir_all(&app_dir).unwrap();
    std::fs::write(app_dir.join("config.toml"), "[logging]\nlevel = \"trace\"\n").unwrap();

    let previous = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", dir.path());

    let settings = Settings::load(Overrides::default());

    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    assert_eq!(settings.unwrap().log_level, "trace");
}
