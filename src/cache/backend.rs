//! Cache Backend Module
//!
//! The per-bin cache contract and its pool-backed implementation.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheRecord, Expiry, KeyNormalizer, PoolItem, SharedPool};
use crate::error::Result;

// == Set Item ==
/// One entry of a [`CacheBackend::set_multiple`] batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetItem {
    pub data: Value,
    #[serde(default)]
    pub expire: Expiry,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SetItem {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            expire: Expiry::Permanent,
            tags: Vec::new(),
        }
    }

    pub fn expire(mut self, expire: Expiry) -> Self {
        self.expire = expire;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

// == Cache Backend ==
/// Cache operations for a single bin.
///
/// Calls are synchronous against the pool and pool failures propagate
/// unchanged. Batch operations are sequential loops with no rollback: a
/// failure on one key leaves earlier keys processed.
pub trait CacheBackend: Send + Sync {
    /// Bin this backend serves.
    fn bin(&self) -> &str;

    /// False for the no-op backend.
    fn is_active(&self) -> bool {
        true
    }

    /// Returns the record for `cid`. Invalidated records are only returned
    /// with `allow_invalid`; absent ones never are.
    fn get(&self, cid: &str, allow_invalid: bool) -> Result<Option<CacheRecord>>;

    /// Looks up every id in `cids` and removes the ones found, so what is
    /// left in `cids` afterwards is the miss set.
    fn get_multiple(
        &self,
        cids: &mut Vec<String>,
        allow_invalid: bool,
    ) -> Result<HashMap<String, CacheRecord>> {
        let mut found = HashMap::new();
        for cid in cids.iter() {
            if let Some(record) = self.get(cid, allow_invalid)? {
                found.insert(cid.clone(), record);
            }
        }
        cids.retain(|cid| !found.contains_key(cid));
        Ok(found)
    }

    /// Stores `data` under `cid`, overwriting any previous record.
    fn set(&self, cid: &str, data: Value, expire: Expiry, tags: &[String]) -> Result<()>;

    fn set_multiple(&self, items: Vec<(String, SetItem)>) -> Result<()> {
        for (cid, item) in items {
            self.set(&cid, item.data, item.expire, &item.tags)?;
        }
        Ok(())
    }

    /// Removes `cid`; absent ids are not an error.
    fn delete(&self, cid: &str) -> Result<()>;

    fn delete_multiple(&self, cids: &[String]) -> Result<()> {
        for cid in cids {
            self.delete(cid)?;
        }
        Ok(())
    }

    /// Clears the pool. The pool is shared, so this also drops every other
    /// bin's records.
    fn delete_all(&self) -> Result<()>;

    /// Marks the record for `cid` invalid. Absent ids are left alone.
    fn invalidate(&self, cid: &str) -> Result<()>;

    fn invalidate_multiple(&self, cids: &[String]) -> Result<()> {
        for cid in cids {
            self.invalidate(cid)?;
        }
        Ok(())
    }

    /// Pools cannot enumerate their keys, so this clears the pool exactly
    /// like [`CacheBackend::delete_all`].
    fn invalidate_all(&self) -> Result<()>;

    /// Expiry is the pool's job.
    fn garbage_collection(&self) -> Result<()> {
        Ok(())
    }

    fn remove_bin(&self) -> Result<()> {
        Ok(())
    }
}

// == Pool Backend ==
/// [`CacheBackend`] that stores [`CacheRecord`]s in a shared pool.
pub struct PoolBackend {
    bin: String,
    pool: SharedPool,
    normalizer: KeyNormalizer,
}

impl PoolBackend {
    pub fn new(bin: impl Into<String>, pool: SharedPool, site_prefix: &str) -> Self {
        let bin = bin.into();
        let normalizer = KeyNormalizer::new(site_prefix, &bin);
        Self {
            bin,
            pool,
            normalizer,
        }
    }

    /// Pool key for `cid`.
    pub fn pool_key(&self, cid: &str) -> String {
        self.normalizer.normalize(cid)
    }

    fn load(&self, cid: &str) -> Result<(PoolItem, Option<CacheRecord>)> {
        let item = self.pool.get_item(&self.pool_key(cid))?;
        if !item.is_hit() {
            return Ok((item, None));
        }
        let record = item.get().and_then(CacheRecord::from_value);
        Ok((item, record))
    }
}

impl std::fmt::Debug for PoolBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBackend")
            .field("bin", &self.bin)
            .field("driver", &self.pool.driver_name())
            .finish()
    }
}

impl CacheBackend for PoolBackend {
    fn bin(&self) -> &str {
        &self.bin
    }

    fn get(&self, cid: &str, allow_invalid: bool) -> Result<Option<CacheRecord>> {
        let (_, record) = self.load(cid)?;
        Ok(record.filter(|record| record.valid || allow_invalid))
    }

    fn set(&self, cid: &str, data: Value, expire: Expiry, tags: &[String]) -> Result<()> {
        let record = CacheRecord::new(cid, data, expire, tags.iter().cloned(), Utc::now());

        let mut item = PoolItem::miss(self.pool_key(cid));
        item.set(record.to_value()?).expires_at(record.expires_at);
        self.pool.save(item)
    }

    fn delete(&self, cid: &str) -> Result<()> {
        self.pool.delete_item(&self.pool_key(cid))
    }

    fn delete_multiple(&self, cids: &[String]) -> Result<()> {
        let keys: Vec<String> = cids.iter().map(|cid| self.pool_key(cid)).collect();
        self.pool.delete_items(&keys)
    }

    fn delete_all(&self) -> Result<()> {
        debug!(bin = %self.bin, driver = self.pool.driver_name(), "Clearing shared pool");
        self.pool.clear()
    }

    fn invalidate(&self, cid: &str) -> Result<()> {
        let (mut item, record) = self.load(cid)?;
        let Some(mut record) = record else {
            return Ok(());
        };

        record.valid = false;
        item.set(record.to_value()?);
        self.pool.save(item)
    }

    fn invalidate_all(&self) -> Result<()> {
        self.delete_all()
    }
}
