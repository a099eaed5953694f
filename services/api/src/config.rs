//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Loading fails fast with a typed error
//! when a required variable is missing, so a misconfigured deployment never
//! serves a single request.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which concrete `KvStore` adapter to wire up at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KvBackend {
    Redis,
    Memory,
}

/// Which concrete `BlobStore` adapter to wire up at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlobBackend {
    Http,
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub kv_backend: KvBackend,
    pub redis_url: Option<String>,
    pub blob_backend: BlobBackend,
    pub blob_api_url: Option<String>,
    pub blob_rw_token: Option<String>,
    pub jwt_secret: String,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub cors_origin: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
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

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Storage Backends ---
        let kv_backend_str = std::env::var("KV_BACKEND").unwrap_or_else(|_| "redis".to_string());
        let kv_backend = match kv_backend_str.as_str() {
            "redis" => KvBackend::Redis,
            "memory" => KvBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "KV_BACKEND".to_string(),
                    format!("'{}' is not one of: redis, memory", other),
                ))
            }
        };
        let redis_url = std::env::var("REDIS_URL").ok();
        if kv_backend == KvBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingVar("REDIS_URL".to_string()));
        }

        let blob_backend_str = std::env::var("BLOB_BACKEND").unwrap_or_else(|_| "http".to_string());
        let blob_backend = match blob_backend_str.as_str() {
            "http" => BlobBackend::Http,
            "memory" => BlobBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "BLOB_BACKEND".to_string(),
                    format!("'{}' is not one of: http, memory", other),
                ))
            }
        };
        let blob_api_url = std::env::var("BLOB_API_URL").ok();
        let blob_rw_token = std::env::var("BLOB_RW_TOKEN").ok();
        if blob_backend == BlobBackend::Http {
            if blob_api_url.is_none() {
                return Err(ConfigError::MissingVar("BLOB_API_URL".to_string()));
            }
            if blob_rw_token.is_none() {
                return Err(ConfigError::MissingVar("BLOB_RW_TOKEN".to_string()));
            }
        }

        // --- Load Secrets and API Keys ---
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::MissingVar("JWT_SECRET".to_string()))?;
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        // --- Load Adapter-specific Settings ---
        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Optional Bootstrap Admin ---
        let admin_email = std::env::var("ADMIN_EMAIL").ok();
        let admin_password = std::env::var("ADMIN_PASSWORD").ok();

        Ok(Self {
            bind_address,
            log_level,
            kv_backend,
            redis_url,
            blob_backend,
            blob_api_url,
            blob_rw_token,
            jwt_secret,
            openai_api_key,
            chat_model,
            cors_origin,
            admin_email,
            admin_password,
        })
    }
}
