//! Configuration management for the server.

use std::env;

/// Default cap on the number of change lists in one sync request.
pub const DEFAULT_MAX_CHANGE_LISTS: usize = 10_000;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Largest number of change lists accepted in one request
    pub max_change_lists: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let max_change_lists = match env::var("SYNC_MAX_CHANGE_LISTS") {
            Ok(raw) => match raw.parse() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(ConfigError::InvalidLimit),
            },
            Err(_) => DEFAULT_MAX_CHANGE_LISTS,
        };

        Ok(Self {
            host,
            port,
            max_change_lists,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_change_lists: DEFAULT_MAX_CHANGE_LISTS,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("SYNC_MAX_CHANGE_LISTS must be a positive integer")]
    InvalidLimit,
}
