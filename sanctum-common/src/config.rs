//! Configuration loading and validation
//!
//! Each setting is resolved in priority order:
//! 1. Command-line flag or environment variable (both arrive as [`Overrides`])
//! 2. TOML config file
//! 3. Compiled default
//!
//! Production mode refuses to start without real secrets; development mode
//! fills the gaps with local defaults.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::auth::{HashCost, DEV_TOKEN_SECRET};
use crate::{Error, Result};

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:5780";

/// Default per-request timeout, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Minimum token secret length accepted in production
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";
const APP_DIR: &str = "sanctum";

// ========================================
// Enumerations
// ========================================

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Development,
    Production,
}

impl RunMode {
    pub fn is_production(&self) -> bool {
        matches!(self, RunMode::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Development => "development",
            RunMode::Production => "production",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(RunMode::Development),
            "production" | "prod" => Ok(RunMode::Production),
            other => Err(Error::Config(format!(
                "Unknown run mode '{}' (expected development or production)",
                other
            ))),
        }
    }
}

/// Where uploaded bytes are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    #[default]
    Filesystem,
    Http,
}

impl BlobBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobBackend::Filesystem => "filesystem",
            BlobBackend::Http => "http",
        }
    }
}

impl FromStr for BlobBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filesystem" | "fs" => Ok(BlobBackend::Filesystem),
            "http" => Ok(BlobBackend::Http),
            other => Err(Error::Config(format!(
                "Unknown blob backend '{}' (expected filesystem or http)",
                other
            ))),
        }
    }
}

/// String whose value never appears in `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

// ========================================
// Sources
// ========================================

/// Values from the command line / environment (highest priority)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub mode: Option<RunMode>,
    pub bind: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub database_url: Option<String>,
    pub token_secret: Option<Secret>,
    pub blob_backend: Option<BlobBackend>,
    pub blob_root: Option<PathBuf>,
    pub blob_public_url: Option<String>,
    pub blob_endpoint: Option<String>,
    pub blob_write_token: Option<Secret>,
}

/// TOML file layout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub mode: Option<RunMode>,
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub blob: BlobSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSection {
    pub token_secret: Option<String>,
    pub hash_memory_kib: Option<u32>,
    pub hash_iterations: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlobSection {
    pub backend: Option<BlobBackend>,
    pub root: Option<PathBuf>,
    pub public_base_url: Option<String>,
    pub endpoint: Option<String>,
    pub write_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
}

impl TomlConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Read a config file; a missing file yields the empty config
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Platform config file location (`<config_dir>/sanctum/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Platform data directory for the database and filesystem blobs
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./sanctum_data"))
}

// ========================================
// Resolved settings
// ========================================

/// Blob storage settings
#[derive(Debug, Clone)]
pub struct BlobSettings {
    pub backend: BlobBackend,
    pub root: PathBuf,
    pub public_base_url: String,
    pub endpoint: Option<String>,
    pub write_token: Option<Secret>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: RunMode,
    pub bind: String,
    pub request_timeout: Duration,
    pub database_url: String,
    pub max_connections: u32,
    pub token_secret: Secret,
    /// True when the development-only signing key is in use
    pub token_secret_is_fallback: bool,
    pub hash_cost: HashCost,
    pub blob: BlobSettings,
    pub log_level: String,
}

impl Settings {
    /// Resolve settings, reading the TOML file named by the overrides or the platform default
    pub fn load(overrides: Overrides) -> Result<Self> {
        let toml = match overrides.config_path.clone().or_else(default_config_path) {
            Some(path) => TomlConfig::load(&path)?,
            None => TomlConfig::default(),
        };
        Self::resolve(overrides, toml, &default_data_dir())
    }

    /// Merge overrides over the TOML file over defaults, then validate
    pub fn resolve(overrides: Overrides, toml: TomlConfig, data_dir: &Path) -> Result<Self> {
        let mode = overrides.mode.or(toml.mode).unwrap_or_default();

        let bind = overrides
            .bind
            .or(toml.server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let timeout_secs = overrides
            .request_timeout_secs
            .or(toml.server.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }

        let database_url = match overrides.database_url.or(toml.database.url) {
            Some(url) => url,
            None if mode.is_production() => {
                return Err(Error::Config(
                    "SANCTUM_DATABASE_URL is required in production mode".to_string(),
                ))
            }
            None => format!("sqlite://{}", data_dir.join("sanctum.db").display()),
        };

        let max_connections = toml
            .database
            .max_connections
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
            .max(1);

        let configured_secret = overrides
            .token_secret
            .or_else(|| toml.auth.token_secret.map(Secret::new))
            .filter(|s| !s.expose().is_empty());
        let (token_secret, token_secret_is_fallback) = match configured_secret {
            Some(secret) => {
                if mode.is_production() && secret.expose().len() < MIN_TOKEN_SECRET_LEN {
                    return Err(Error::Config(format!(
                        "Token secret must be at least {} bytes in production mode",
                        MIN_TOKEN_SECRET_LEN
                    )));
                }
                (secret, false)
            }
            None if mode.is_production() => {
                return Err(Error::Config(
                    "SANCTUM_TOKEN_SECRET is required in production mode".to_string(),
                ))
            }
            None => (Secret::new(DEV_TOKEN_SECRET), true),
        };

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: toml.auth.hash_memory_kib.unwrap_or(defaults.memory_kib),
            iterations: toml.auth.hash_iterations.unwrap_or(defaults.iterations),
        };

        let blob_overrides = BlobOverrides {
            backend: overrides.blob_backend,
            root: overrides.blob_root,
            public_url: overrides.blob_public_url,
            endpoint: overrides.blob_endpoint,
            write_token: overrides.blob_write_token,
        };
        let blob = resolve_blob(blob_overrides, toml.blob, mode, &bind, data_dir)?;

        let log_level = toml
            .logging
            .level
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Self {
            mode,
            bind,
            request_timeout: Duration::from_secs(timeout_secs),
            database_url,
            max_connections,
            token_secret,
            token_secret_is_fallback,
            hash_cost,
            blob,
            log_level,
        })
    }
}

struct BlobOverrides {
    backend: Option<BlobBackend>,
    root: Option<PathBuf>,
    public_url: Option<String>,
    endpoint: Option<String>,
    write_token: Option<Secret>,
}

fn resolve_blob(
    overrides: BlobOverrides,
    toml: BlobSection,
    mode: RunMode,
    bind: &str,
    data_dir: &Path,
) -> Result<BlobSettings> {
    let backend = overrides.backend.or(toml.backend).unwrap_or_default();

    let root = overrides
        .root
        .or(toml.root)
        .unwrap_or_else(|| data_dir.join("blobs"));

    let public_base_url = overrides
        .public_url
        .or(toml.public_base_url)
        .unwrap_or_else(|| format!("http://{}/blob/files", bind));

    let endpoint = overrides
        .endpoint
        .or(toml.endpoint)
        .filter(|e| !e.is_empty());
    let write_token = overrides
        .write_token
        .or_else(|| toml.write_token.map(Secret::new))
        .filter(|t| !t.expose().is_empty());

    if backend == BlobBackend::Http {
        if endpoint.is_none() {
            return Err(Error::Config(
                "SANCTUM_BLOB_ENDPOINT is required for the http blob backend".to_string(),
            ));
        }
        if mode.is_production() && write_token.is_none() {
            return Err(Error::Config(
                "SANCTUM_BLOB_WRITE_TOKEN is required for the http blob backend in production mode"
                    .to_string(),
            ));
        }
    }

    Ok(BlobSettings {
        backend,
        root,
        public_base_url: public_base_url.trim_end_matches('/').to_string(),
        endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
        write_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_dir() -> PathBuf {
        PathBuf::from("/tmp/sanctum-test-data")
    }

    #[test]
    fn test_development_defaults() {
        let settings =
            Settings::resolve(Overrides::default(), TomlConfig::default(), &data_dir()).unwrap();

        assert_eq!(settings.mode, RunMode::Development);
        assert_eq!(settings.bind, DEFAULT_BIND);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(
            settings.database_url,
            "sqlite:///tmp/sanctum-test-data/sanctum.db"
        );
        assert!(settings.token_secret_is_fallback);
        assert_eq!(settings.token_secret.expose(), DEV_TOKEN_SECRET);
        assert_eq!(settings.blob.backend, BlobBackend::Filesystem);
        assert_eq!(settings.blob.root, data_dir().join("blobs"));
        assert_eq!(
            settings.blob.public_base_url,
            "http://127.0.0.1:5780/blob/files"
        );
        assert_eq!(settings.hash_cost, HashCost::default());
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_overrides_beat_toml() {
        let toml = TomlConfig::parse(
            r#"
            [server]
            bind = "0.0.0.0:9000"
            request_timeout_secs = 5

            [database]
            url = "sqlite://from-toml.db"
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            bind: Some("127.0.0.1:7000".to_string()),
            ..Default::default()
        };

        let settings = Settings::resolve(overrides, toml, &data_dir()).unwrap();
        assert_eq!(settings.bind, "127.0.0.1:7000");
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.database_url, "sqlite://from-toml.db");
    }

    #[test]
    fn test_production_requires_database_and_secret() {
        let overrides = Overrides {
            mode: Some(RunMode::Production),
            ..Default::default()
        };
        let err = Settings::resolve(overrides.clone(), TomlConfig::default(), &data_dir())
            .unwrap_err();
        assert!(err.to_string().contains("SANCTUM_DATABASE_URL"));

        let with_db = Overrides {
            database_url: Some("sqlite://prod.db".to_string()),
            ..overrides
        };
        let err = Settings::resolve(with_db, TomlConfig::default(), &data_dir()).unwrap_err();
        assert!(err.to_string().contains("SANCTUM_TOKEN_SECRET"));
    }

    #[test]
    fn test_production_rejects_short_secret() {
        let overrides = Overrides {
            mode: Some(RunMode::Production),
            database_url: Some("sqlite://prod.db".to_string()),
            token_secret: Some(Secret::new("too-short")),
            ..Default::default()
        };
        let err = Settings::resolve(overrides, TomlConfig::default(), &data_dir()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_production_with_secrets_succeeds() {
        let overrides = Overrides {
            mode: Some(RunMode::Production),
            database_url: Some("sqlite://prod.db".to_string()),
            token_secret: Some(Secret::new("x".repeat(48))),
            ..Default::default()
        };
        let settings = Settings::resolve(overrides, TomlConfig::default(), &data_dir()).unwrap();
        assert!(!settings.token_secret_is_fallback);
        assert!(settings.mode.is_production());
    }

    #[test]
    fn test_http_backend_requirements() {
        let toml = TomlConfig::parse("[blob]\nbackend = \"http\"\n").unwrap();
        let err = Settings::resolve(Overrides::default(), toml.clone(), &data_dir()).unwrap_err();
        assert!(err.to_string().contains("SANCTUM_BLOB_ENDPOINT"));

        let prod = Overrides {
            mode: Some(RunMode::Production),
            database_url: Some("sqlite://prod.db".to_string()),
            token_secret: Some(Secret::new("y".repeat(32))),
            blob_endpoint: Some("https://blobs.example.com/".to_string()),
            ..Default::default()
        };
        let err = Settings::resolve(prod.clone(), toml.clone(), &data_dir()).unwrap_err();
        assert!(err.to_string().contains("SANCTUM_BLOB_WRITE_TOKEN"));

        let complete = Overrides {
            blob_write_token: Some(Secret::new("write-token")),
            ..prod
        };
        let settings = Settings::resolve(complete, toml, &data_dir()).unwrap();
        assert_eq!(
            settings.blob.endpoint.as_deref(),
            Some("https://blobs.example.com")
        );
    }

    #[test]
    fn test_toml_rejects_unknown_fields() {
        assert!(TomlConfig::parse("[server]\nport = 80\n").is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let overrides = Overrides {
            request_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve(overrides, TomlConfig::default(), &data_dir()).is_err());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Production".parse::<RunMode>().unwrap(), RunMode::Production);
        assert_eq!("dev".parse::<RunMode>().unwrap(), RunMode::Development);
        assert!("staging".parse::<RunMode>().is_err());
        assert_eq!("HTTP".parse::<BlobBackend>().unwrap(), BlobBackend::Http);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("super-secret-value");
        assert!(!format!("{:?}", secret).contains("super-secret"));
    }
}
