//! Configuration for the gatekeeper.

use anyhow::{bail, Context, Result};
use registration_store::Backend;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::PathBuf;

/// Gatekeeper configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Registration storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Admin account configuration
    #[serde(default)]
    pub admin: AdminConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Json,
    Encrypted,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Persistence backend
    #[serde(default = "default_storage_kind")]
    pub backend: StorageKind,

    /// Path to the data file
    #[serde(default = "default_data_path")]
    pub path: PathBuf,

    /// Passphrase for the encrypted backend
    #[serde(default)]
    pub encryption_key: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Admin username
    #[serde(default = "default_admin_username")]
    pub username: String,

    /// Admin password (admin actions are disabled when unset)
    #[serde(default)]
    pub password: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_kind(),
            path: default_data_path(),
            encryption_key: None,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Json
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_admin_username() -> String {
    "admin".into()
}

fn default_global_rpm() -> u32 {
    120
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl StorageConfig {
    /// Build the persistence backend this section describes.
    pub fn backend(&self) -> Result<Backend> {
        match self.backend {
            StorageKind::Json => Ok(Backend::json(&self.path)),
            StorageKind::Encrypted => match &self.encryption_key {
                Some(key) if !key.expose_secret().is_empty() => {
                    Ok(Backend::encrypted(&self.path, key.expose_secret()))
                }
                _ => bail!("STORAGE__ENCRYPTION_KEY is required for the encrypted backend"),
            },
            StorageKind::Memory => Ok(Backend::memory()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Nested keys use `__` (`SERVER__PORT`, `STORAGE__PATH`). The bare
    /// `PORT` and `DATA_FILE` variables are honored as well and take
    /// precedence.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())
            .context("Failed to apply PORT")?
            .set_override_option("storage.path", std::env::var("DATA_FILE").ok())
            .context("Failed to apply DATA_FILE")?;

        Self::from_builder(builder)
    }

    /// Deserialize from an already-assembled source.
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
