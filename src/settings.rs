//! Cache Settings Module
//!
//! The settings document: whether caching is on, which driver backs the
//! pool, and which bins use it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::drivers::{DriverOptions, DriverRegistry, PoolDefaults};
use crate::error::{CacheError, Result};
use crate::tokens::TokenContext;

/// Allow-list entry that matches every bin.
pub const WILDCARD_BIN: &str = "default";

pub const MIN_PREFIX_LENGTH: usize = 2;
pub const MAX_PREFIX_LENGTH: usize = 8;

const REDACTED: &str = "********";

// == Environment ==
/// Deployment environment; controls how loudly problems are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    #[default]
    Prod,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Dev => write!(f, "dev"),
            Environment::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for Environment {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            other => Err(CacheError::InvalidRequest(format!(
                "unknown environment '{}', expected dev or prod",
                other
            ))),
        }
    }
}

// == Settings ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch; when off every bin gets the null backend
    pub enabled: bool,
    pub env: Environment,
    /// Site-wide key prefix, 2 to 8 of `[A-Za-z0-9_]`
    pub prefix: String,
    /// Seconds, for items the pool receives without an expiry
    pub default_ttl: i64,
    pub default_driver: String,
    /// Bins routed to the pool; `default` matches all of them
    pub bins: Vec<String>,
    /// Default for file-based drivers' `.htaccess` generation
    pub htaccess: bool,
    pub drivers_config: BTreeMap<String, DriverOptions>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            env: Environment::Prod,
            prefix: "bc".to_string(),
            default_ttl: 900,
            default_driver: "memory".to_string(),
            bins: vec![WILDCARD_BIN.to_string()],
            htaccess: true,
            drivers_config: BTreeMap::new(),
        }
    }
}

impl Settings {
    // == Loading ==
    /// Parses a JSON settings document and normalizes its bin list.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut settings: Settings = serde_json::from_str(json)
            .map_err(|e| CacheError::InvalidRequest(format!("invalid settings document: {}", e)))?;
        settings.bins = normalize_bins(settings.bins);
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CacheError::InvalidRequest(format!(
                "cannot read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    // == Validation ==
    /// Checks the prefix, TTL, and that the default driver is usable.
    pub fn validate(&self, registry: &DriverRegistry) -> Result<()> {
        let driver = self.default_driver.as_str();

        if !registry.is_usable(driver) {
            return Err(CacheError::configuration(driver, "the driver chosen is unavailable"));
        }

        let len = self.prefix.len();
        if len < MIN_PREFIX_LENGTH {
            return Err(CacheError::configuration(
                driver,
                format!("the prefix must be {} chars length minimum", MIN_PREFIX_LENGTH),
            ));
        }
        if len > MAX_PREFIX_LENGTH {
            return Err(CacheError::configuration(
                driver,
                format!("the prefix must be {} chars length maximum", MAX_PREFIX_LENGTH),
            ));
        }
        if !self
            .prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(CacheError::configuration(
                driver,
                "the prefix must contain only letters, numbers and underscore chars",
            ));
        }

        if self.default_ttl <= 0 {
            return Err(CacheError::configuration(driver, "the default TTL must be positive"));
        }

        Ok(())
    }

    /// True when `bin` is in the allow-list or the list holds `default`.
    pub fn handles_bin(&self, bin: &str) -> bool {
        self.bins.iter().any(|b| b == bin || b == WILDCARD_BIN)
    }

    /// Options recorded for the default driver.
    pub fn driver_options(&self) -> Option<&DriverOptions> {
        self.drivers_config
            .get(&self.default_driver)
            .or_else(|| self.drivers_config.get(&self.default_driver.to_ascii_lowercase()))
    }

    pub fn pool_defaults(&self, tokens: TokenContext) -> PoolDefaults {
        PoolDefaults {
            default_ttl: self.default_ttl,
            htaccess: self.htaccess,
            tokens,
        }
    }

    /// Copy with secret driver options masked, for display.
    pub fn redacted(&self) -> Settings {
        let mut copy = self.clone();
        for options in copy.drivers_config.values_mut() {
            for (key, value) in options.iter_mut() {
                let secret = key.contains("password") || key == "security_key";
                if secret && matches!(value, Value::String(s) if !s.is_empty()) {
                    *value = Value::String(REDACTED.to_string());
                }
            }
        }
        copy
    }
}

/// Trims entries, drops blanks and duplicates, keeps order.
fn normalize_bins(bins: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(bins.len());
    for bin in bins {
        let bin = bin.trim();
        if !bin.is_empty() && !seen.iter().any(|b: &String| b == bin) {
            seen.push(bin.to_string());
        }
    }
    seen
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Settings {
        Settings {
            enabled: true,
            prefix: "site_1".to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.env, Environment::Prod);
        assert_eq!(settings.default_driver, "memory");
        assert_eq!(settings.bins, vec!["default".to_string()]);
        assert!(settings.validate(&DriverRegistry::default()).is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults_and_normalizes_bins() {
        let json = r#"{
            "enabled": true,
            "env": "dev",
            "prefix": "D8",
            "default_driver": "redis",
            "bins": ["render", "", " config ", "render"],
            "drivers_config": {"redis": {"host": "127.0.0.1", "port": 6379}}
        }"#;
        let settings = Settings::from_json(json).unwrap();

        assert!(settings.enabled);
        assert_eq!(settings.env, Environment::Dev);
        assert_eq!(settings.default_ttl, 900);
        assert_eq!(settings.bins, vec!["render".to_string(), "config".to_string()]);
        assert_eq!(settings.driver_options().unwrap()["host"], "127.0.0.1");
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(Settings::from_json("{not json").is_err());
        assert!(Settings::from_json(r#"{"env": "staging"}"#).is_err());
    }

    #[test]
    fn test_prefix_validation() {
        let registry = DriverRegistry::default();
        for bad in ["a", "waytoolong", "bad-char", "sp ace"] {
            let settings = Settings {
                prefix: bad.to_string(),
                ..valid()
            };
            let err = settings.validate(&registry).unwrap_err();
            assert!(err.is_configuration(), "{} should be rejected", bad);
        }
        for good in ["ab", "site_1", "ABCDEFGH"] {
            let settings = Settings {
                prefix: good.to_string(),
                ..valid()
            };
            assert!(settings.validate(&registry).is_ok(), "{} should pass", good);
        }
    }

    #[test]
    fn test_unavailable_driver_is_rejected() {
        let settings = Settings {
            default_driver: "cookie".to_string(),
            ..valid()
        };
        let err = settings.validate(&DriverRegistry::default()).unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }

    #[test]
    fn test_ttl_must_be_positive() {
        let settings = Settings {
            default_ttl: 0,
            ..valid()
        };
        assert!(settings.validate(&DriverRegistry::default()).is_err());
    }

    #[test]
    fn test_handles_bin() {
        let wildcard = valid();
        assert!(wildcard.handles_bin("render"));

        let explicit = Settings {
            bins: vec!["config".to_string()],
            ..valid()
        };
        assert!(explicit.handles_bin("config"));
        assert!(!explicit.handles_bin("render"));

        let none = Settings {
            bins: vec![],
            ..valid()
        };
        assert!(!none.handles_bin("render"));
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let json = r#"{
            "drivers_config": {
                "redis": {"host": "h", "password": "hunter2"},
                "files": {"path": "/tmp", "security_key": "k", "password": ""}
            }
        }"#;
        let redacted = Settings::from_json(json).unwrap().redacted();

        assert_eq!(redacted.drivers_config["redis"]["password"], "********");
        assert_eq!(redacted.drivers_config["redis"]["host"], "h");
        assert_eq!(redacted.drivers_config["files"]["security_key"], "********");
        assert_eq!(redacted.drivers_config["files"]["password"], "");
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("DEV".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("qa".parse::<Environment>().is_err());
        assert_eq!(Environment::Dev.to_string(), "dev");
    }
}
