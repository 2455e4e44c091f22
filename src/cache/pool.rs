//! Pool Module
//!
//! The storage contract every driver implements. Backends only ever talk to
//! a pool through this trait.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::cache::CacheStats;
use crate::error::Result;

// == Pool Item ==
/// A pool slot: the normalized key, the stored value if any, and its
/// absolute expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolItem {
    key: String,
    value: Option<Value>,
    expires_at: Option<DateTime<Utc>>,
    hit: bool,
}

impl PoolItem {
    /// An empty slot for `key`.
    pub fn miss(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            expires_at: None,
            hit: false,
        }
    }

    /// A slot loaded from storage.
    pub fn hit(key: impl Into<String>, value: Value, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            key: key.into(),
            value: Some(value),
            expires_at,
            hit: true,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// True when the value was read from storage.
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub fn get(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: Value) -> &mut Self {
        self.value = Some(value);
        self
    }

    pub fn take(self) -> Option<Value> {
        self.value
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn expires_at(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.expires_at = Some(at);
        self
    }

    pub fn expires_after(&mut self, seconds: i64) -> &mut Self {
        self.expires_at = Some(Utc::now() + Duration::seconds(seconds.max(-1)));
        self
    }

    /// True once the expiry has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

// == Cache Pool ==
/// Multi-driver storage engine.
///
/// Implementations must be safe for concurrent use; the backend layer adds
/// no locking of its own. `clear` wipes the whole pool, across every bin
/// that shares it.
pub trait CachePool: Send + Sync {
    /// Driver identifier, e.g. `memory`.
    fn driver_name(&self) -> &str;

    /// Loads the slot for `key`; a miss is `Ok` with `is_hit() == false`.
    fn get_item(&self, key: &str) -> Result<PoolItem>;

    /// Writes the slot. Items without a value are ignored.
    fn save(&self, item: PoolItem) -> Result<()>;

    fn delete_item(&self, key: &str) -> Result<()>;

    fn delete_items(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.delete_item(key)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()>;

    /// Drops expired slots, returning how many were removed.
    fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }

    /// Hit/miss counters, for drivers that keep them.
    fn stats(&self) -> Option<CacheStats> {
        None
    }
}

/// Shared pool handle reused by every bin.
pub type SharedPool = Arc<dyn CachePool>;
