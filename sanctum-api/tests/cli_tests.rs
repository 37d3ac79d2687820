//! CLI parsing and service wiring
//!
//! Environment-variable tests mutate process state and run serially.

use clap::Parser;
use sanctum_api::cli::{build_state, Cli, Command};
use sanctum_common::config::{BlobBackend, RunMode, Settings, TomlConfig};
use sanctum_common::db::init_database;
use serial_test::serial;

const ENV_VARS: &[&str] = &[
    "SANCTUM_CONFIG",
    "SANCTUM_MODE",
    "SANCTUM_BIND",
    "SANCTUM_REQUEST_TIMEOUT_SECS",
    "SANCTUM_DATABASE_URL",
    "SANCTUM_TOKEN_SECRET",
    "SANCTUM_BLOB_BACKEND",
    "SANCTUM_BLOB_ROOT",
    "SANCTUM_BLOB_PUBLIC_URL",
    "SANCTUM_BLOB_ENDPOINT",
    "SANCTUM_BLOB_WRITE_TOKEN",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_env_vars_feed_overrides() {
    clear_env();
    std::env::set_var("SANCTUM_MODE", "production");
    std::env::set_var("SANCTUM_BIND", "0.0.0.0:9000");
    std::env::set_var("SANCTUM_BLOB_BACKEND", "http");

    let cli = Cli::try_parse_from(["sanctum-api"]).unwrap();
    let overrides = cli.overrides();
    clear_env();

    assert_eq!(overrides.mode, Some(RunMode::Production));
    assert_eq!(overrides.bind.as_deref(), Some("0.0.0.0:9000"));
    assert_eq!(overrides.blob_backend, Some(BlobBackend::Http));
    assert!(overrides.token_secret.is_none());
}

#[test]
#[serial]
fn test_flag_beats_env_var() {
    clear_env();
    std::env::set_var("SANCTUM_BIND", "0.0.0.0:9000");

    let cli = Cli::try_parse_from(["sanctum-api", "--bind", "127.0.0.1:6000", "migrate"]).unwrap();
    clear_env();

    assert_eq!(cli.bind.as_deref(), Some("127.0.0.1:6000"));
    assert_eq!(cli.command(), Command::Migrate);
}

#[test]
#[serial]
fn test_subcommands() {
    clear_env();

    let cli = Cli::try_parse_from(["sanctum-api", "delete-user", "alice"]).unwrap();
    assert_eq!(
        cli.command(),
        Command::DeleteUser {
            username: "alice".to_string()
        }
    );

    let cli = Cli::try_parse_from(["sanctum-api", "gen-secret"]).unwrap();
    assert_eq!(cli.command(), Command::GenSecret);

    assert!(Cli::try_parse_from(["sanctum-api", "--mode", "staging"]).is_err());
}

#[tokio::test]
#[serial]
async fn test_build_state_from_settings() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", dir.path().join("wiring.db").display());

    let cli = Cli::try_parse_from([
        "sanctum-api",
        "--database-url",
        db_url.as_str(),
        "--blob-root",
        dir.path().join("blobs").to_str().unwrap(),
    ])
    .unwrap();
    let settings = Settings::resolve(cli.overrides(), TomlConfig::default(), dir.path()).unwrap();
    assert!(settings.token_secret_is_fallback);

    let pool = init_database(&settings.database_url, settings.max_connections)
        .await
        .unwrap();
    let state = build_state(&settings, pool).await.unwrap();

    assert_eq!(state.mode, RunMode::Development);
    assert_eq!(state.blobs.backend_name(), "filesystem");
    assert_eq!(state.blob_files_root.as_deref(), Some(dir.path().join("blobs").as_path()));
    assert!(dir.path().join("blobs").is_dir());
}
