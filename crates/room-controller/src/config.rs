//! Room Controller configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP/WebSocket bind address.
pub const DEFAULT_HTTP_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default idle period before a room actor passivates, in seconds.
pub const DEFAULT_PASSIVATE_AFTER_SECONDS: u64 = 60;

/// Default maximum atom content size in bytes.
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 4096;

/// Default per-connection outbound frame queue capacity.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Room Controller configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Redis connection URL (durable room state).
    /// Protected by `SecretString` to prevent accidental logging.
    pub redis_url: SecretString,

    /// HTTP/WebSocket server bind address (default: "0.0.0.0:8080").
    pub http_bind_address: String,

    /// Idle period before a room actor passivates, in seconds (default: 60).
    pub passivate_after_seconds: u64,

    /// Maximum atom content size in bytes (default: 4096).
    pub max_content_bytes: usize,

    /// Per-connection outbound frame queue capacity (default: 256).
    pub outbound_queue_capacity: usize,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("redis_url", &"[REDACTED]")
            .field("http_bind_address", &self.http_bind_address)
            .field("passivate_after_seconds", &self.passivate_after_seconds)
            .field("max_content_bytes", &self.max_content_bytes)
            .field("outbound_queue_capacity", &self.outbound_queue_capacity)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let redis_url = SecretString::from(
            vars.get("REDIS_URL")
                .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?
                .clone(),
        );

        let http_bind_address = vars
            .get("RC_HTTP_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HTTP_BIND_ADDRESS.to_string());

        let passivate_after_seconds = match vars.get("RC_PASSIVATE_AFTER_SECONDS") {
            Some(s) => s.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("RC_PASSIVATE_AFTER_SECONDS: {s}"))
            })?,
            None => DEFAULT_PASSIVATE_AFTER_SECONDS,
        };

        let max_content_bytes = match vars.get("RC_MAX_CONTENT_BYTES") {
            Some(s) => s
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("RC_MAX_CONTENT_BYTES: {s}")))?,
            None => DEFAULT_MAX_CONTENT_BYTES,
        };

        let outbound_queue_capacity = match vars.get("RC_OUTBOUND_QUEUE_CAPACITY") {
            Some(s) => s.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("RC_OUTBOUND_QUEUE_CAPACITY: {s}"))
            })?,
            None => DEFAULT_OUTBOUND_QUEUE_CAPACITY,
        };

        Ok(Config {
            redis_url,
            http_bind_address,
            passivate_after_seconds,
            max_content_bytes,
            outbound_queue_capacity,
        })
    }
}
