//! Configuration management for the sync daemon.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default scheduler tick.
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Daemon configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote API
    pub remote_url: String,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    /// How often the scheduler re-evaluates queues
    pub tick: Duration,
    /// Timeout applied to each remote request
    pub request_timeout: Duration,
    /// JSON replica file; in-memory when unset
    pub store_path: Option<PathBuf>,
    /// Tenant whose trees are synchronized
    pub builder_id: Option<i64>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let remote_url = lookup("CANOPY_REMOTE_URL").ok_or(ConfigError::MissingRemoteUrl)?;

        let tick_ms: u64 = lookup("CANOPY_TICK_MS")
            .map(|v| v.parse().map_err(|_| ConfigError::InvalidTick))
            .transpose()?
            .unwrap_or(DEFAULT_TICK_MS);
        if tick_ms == 0 {
            return Err(ConfigError::InvalidTick);
        }

        let timeout_secs: u64 = lookup("CANOPY_REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse().map_err(|_| ConfigError::InvalidTimeout))
            .transpose()?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let auth_token = lookup("CANOPY_AUTH_TOKEN").filter(|t| !t.is_empty());
        let store_path = lookup("CANOPY_STORE_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        let builder_id = lookup("CANOPY_BUILDER_ID")
            .filter(|b| !b.is_empty())
            .map(|b| b.trim().parse().map_err(|_| ConfigError::InvalidBuilderId))
            .transpose()?;

        Ok(Self {
            remote_url,
            auth_token,
            tick: Duration::from_millis(tick_ms),
            request_timeout: Duration::from_secs(timeout_secs),
            store_path,
            builder_id,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CANOPY_REMOTE_URL environment variable is required")]
    MissingRemoteUrl,

    #[error("CANOPY_BUILDER_ID environment variable is required")]
    MissingBuilderId,

    #[error("CANOPY_BUILDER_ID must be a numeric id")]
    InvalidBuilderId,

    #[error("Invalid CANOPY_TICK_MS value")]
    InvalidTick,

    #[error("Invalid CANOPY_REQUEST_TIMEOUT_SECS value")]
    InvalidTimeout,
}
