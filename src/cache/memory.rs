//! Memory Pool Module
//!
//! In-process pool driver: a HashMap of slots with LRU eviction and
//! absolute expiry checked on read.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::{CachePool, CacheStats, LruTracker, PoolItem};
use crate::error::{CacheError, Result};

/// Driver identifier for [`MemoryPool`].
pub const MEMORY_DRIVER: &str = "memory";

/// Capacity used when none is configured.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug)]
struct Slot {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Slot {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    lru: LruTracker,
    stats: CacheStats,
}

impl Inner {
    fn remove(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.slots.remove(key).is_some()
    }
}

// == Memory Pool ==
/// Bounded in-memory pool.
#[derive(Debug)]
pub struct MemoryPool {
    inner: Mutex<Inner>,
    max_entries: usize,
    /// Lifetime for items saved without an expiry
    default_ttl: Option<i64>,
}

impl MemoryPool {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
            default_ttl: None,
        }
    }

    /// Items saved without an expiry live for `seconds`.
    pub fn with_default_ttl(mut self, seconds: i64) -> Self {
        self.default_ttl = Some(seconds);
        self
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| CacheError::Pool("memory pool lock poisoned".to_string()))
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl CachePool for MemoryPool {
    fn driver_name(&self) -> &str {
        MEMORY_DRIVER
    }

    // == Get Item ==
    /// Expired slots are dropped on read and reported as misses.
    fn get_item(&self, key: &str) -> Result<PoolItem> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let now = Utc::now();

        let expired = match inner.slots.get(key) {
            Some(slot) if slot.is_expired_at(now) => true,
            Some(slot) => {
                let item = PoolItem::hit(key, slot.value.clone(), slot.expires_at);
                inner.lru.touch(key);
                inner.stats.record_read(true);
                return Ok(item);
            }
            None => false,
        };

        if expired {
            inner.remove(key);
            inner.stats.record_expirations(1);
        }
        inner.stats.record_read(false);
        Ok(PoolItem::miss(key))
    }

    // == Save ==
    /// Overwrites the slot, evicting the least recently used one when full.
    fn save(&self, mut item: PoolItem) -> Result<()> {
        if item.get().is_none() {
            return Ok(());
        }
        if item.expiration().is_none() {
            if let Some(ttl) = self.default_ttl {
                item.expires_after(ttl);
            }
        }

        let key = item.key().to_string();
        let expires_at = item.expiration();
        let Some(value) = item.take() else {
            return Ok(());
        };

        let mut inner = self.lock()?;
        let mut evicted = 0;
        if !inner.slots.contains_key(&key) {
            while inner.slots.len() >= self.max_entries {
                match inner.lru.evict_oldest() {
                    Some(oldest) => {
                        inner.slots.remove(&oldest);
                        evicted += 1;
                    }
                    None => break,
                }
            }
        }

        inner.slots.insert(key.clone(), Slot { value, expires_at });
        inner.lru.touch(&key);
        inner.stats.record_write();
        inner.stats.record_evictions(evicted);
        Ok(())
    }

    fn delete_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn delete_items(&self, keys: &[String]) -> Result<()> {
        let mut inner = self.lock()?;
        for key in keys {
            inner.remove(key);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.slots.clear();
        inner.lru.clear();
        Ok(())
    }

    // == Purge Expired ==
    fn purge_expired(&self) -> Result<usize> {
        let mut inner = self.lock()?;
        let now = Utc::now();

        let expired: Vec<String> = inner
            .slots
            .iter()
            .filter(|(_, slot)| slot.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }
        inner.stats.record_expirations(expired.len());
        Ok(expired.len())
    }

    fn stats(&self) -> Option<CacheStats> {
        let inner = self.lock().ok()?;
        let mut stats = inner.stats.clone();
        stats.total_entries = inner.slots.len();
        Some(stats)
    }
}
