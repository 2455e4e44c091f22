//! Configuration Module
//!
//! Handles loading the server configuration from environment variables.
//! Cache behaviour itself lives in the [`Settings`] document the
//! configuration points at.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::cache::FailureMode;
use crate::error::Result;
use crate::settings::Settings;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Path to the JSON cache settings document
    pub settings_path: Option<PathBuf>,
    /// Background purge task interval in seconds
    pub cleanup_interval: u64,
    /// What to do when the configured pool cannot be opened
    pub failure_mode: FailureMode,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `BINCACHE_SETTINGS` - Settings document path (default: none)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds (default: 1)
    /// - `BINCACHE_FAILURE_MODE` - `strict` or `degraded` (default: degraded)
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            settings_path: env::var("BINCACHE_SETTINGS")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(1),
            failure_mode: env::var("BINCACHE_FAILURE_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(FailureMode::Degraded),
        }
    }

    /// Reads the settings document, or the defaults when none is configured.
    pub fn load_settings(&self) -> Result<Settings> {
        match &self.settings_path {
            Some(path) => Settings::load(path),
            None => {
                warn!("BINCACHE_SETTINGS not set, using default cache settings");
                Ok(Settings::default())
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            settings_path: None,
            cleanup_interval: 1,
            failure_mode: FailureMode::Degraded,
        }
    }
}
