//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default bound on every remote task store request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote task store (no trailing slash)
    pub task_store_url: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// JSON file backing the refresh flags
    pub flag_store_path: PathBuf,
    /// Timeout applied to each task store request
    pub request_timeout: Duration,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let task_store_url = env::var("TASK_STORE_URL")
            .map_err(|_| ConfigError::Missing("TASK_STORE_URL"))?
            .trim()
            .trim_end_matches('/')
            .to_string();
        if task_store_url.is_empty() {
            return Err(ConfigError::Invalid("TASK_STORE_URL", "empty".to_string()));
        }

        let timeout_secs = match env::var("TASK_STORE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid("TASK_STORE_TIMEOUT_SECS", raw))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            Err(_) => 8080,
        };

        Ok(Self {
            task_store_url,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            port,
            flag_store_path: env::var("FLAG_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("amoro_flags.json")),
            request_timeout: Duration::from_secs(timeout_secs),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            task_store_url: "http://127.0.0.1:9".to_string(),
            frontend_url: "http://localhost:8081".to_string(),
            port: 8080,
            flag_store_path: PathBuf::from("amoro_flags.json"),
            request_timeout: Duration::from_secs(2),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
