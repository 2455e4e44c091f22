//! Response DTOs for the cache HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::cache::{CacheRecord, CacheStats};
use crate::settings::Settings;

/// Response body for `GET /bins/:bin/items/:cid`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub bin: String,
    pub record: CacheRecord,
}

impl GetResponse {
    pub fn new(bin: impl Into<String>, record: CacheRecord) -> Self {
        Self {
            bin: bin.into(),
            record,
        }
    }
}

/// Response body for `POST /bins/:bin/lookup`
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub items: BTreeMap<String, CacheRecord>,
    /// Ids that were not found
    pub misses: Vec<String>,
}

impl LookupResponse {
    pub fn new(items: HashMap<String, CacheRecord>, misses: Vec<String>) -> Self {
        Self {
            items: items.into_iter().collect(),
            misses,
        }
    }
}

/// Acknowledgement for every write endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub message: String,
    pub bin: String,
    /// False when the bin is served by the null backend
    pub cached: bool,
}

impl AckResponse {
    pub fn new(bin: impl Into<String>, cached: bool, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            bin: bin.into(),
            cached,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub driver: String,
    pub degraded: bool,
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(driver: impl Into<String>, degraded: bool, stats: Option<CacheStats>) -> Self {
        let stats = stats.unwrap_or_default();
        Self {
            driver: driver.into(),
            degraded,
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for `GET /admin/settings`
#[derive(Debug, Clone, Serialize)]
pub struct SettingsResponse {
    pub settings: Settings,
    pub driver: String,
    pub degraded: bool,
    /// Whether the configuration surface's own bin is cached
    pub admin_cache_active: bool,
    /// True when the document was read back from that cache
    pub from_cache: bool,
}

/// Response body for `GET /admin/drivers`
#[derive(Debug, Clone, Serialize)]
pub struct DriversResponse {
    pub drivers: Vec<String>,
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
