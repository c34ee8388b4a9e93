//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use fundiq_core::IngestionMode;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Object storage settings, only needed in cloud-storage mode.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub base_url: String,
    pub bucket: String,
    pub service_key: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub ingestion_mode: IngestionMode,
    pub parser_url: String,
    pub parser_timeout: Duration,
    pub storage: Option<StorageConfig>,
    pub user_id: Uuid,
    pub max_file_bytes: usize,
    pub progress_clear_delay: Duration,
    pub cors_origin: String,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Ingestion Settings ---
        let ingestion_mode = parse_var("INGESTION_MODE", IngestionMode::LocalFirst)?;
        let parser_url = var_or("PARSER_URL", "http://localhost:8000");
        let parser_timeout = Duration::from_secs(parse_var("PARSER_TIMEOUT_SECS", 300u64)?);

        let storage = match ingestion_mode {
            IngestionMode::CloudStorage => Some(StorageConfig {
                base_url: std::env::var("STORAGE_URL")
                    .map_err(|_| ConfigError::MissingVar("STORAGE_URL".to_string()))?,
                bucket: var_or("STORAGE_BUCKET", "documents"),
                service_key: std::env::var("STORAGE_SERVICE_KEY")
                    .map_err(|_| ConfigError::MissingVar("STORAGE_SERVICE_KEY".to_string()))?,
            }),
            IngestionMode::LocalFirst => None,
        };

        // --- Load Session Settings ---
        let user_id = parse_var("FUNDIQ_USER_ID", Uuid::nil())?;
        let max_file_bytes = parse_var("MAX_FILE_BYTES", 50 * 1024 * 1024usize)?;
        let progress_clear_delay =
            Duration::from_secs(parse_var("PROGRESS_CLEAR_DELAY_SECS", 5u64)?);
        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:3000");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            ingestion_mode,
            parser_url,
            parser_timeout,
            storage,
            user_id,
            max_file_bytes,
            progress_clear_delay,
            cors_origin,
        })
    }
}
