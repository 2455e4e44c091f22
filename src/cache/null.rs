//! Null Backend Module
//!
//! Stands in for bins that are not cached, so callers never branch on
//! whether caching is active.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::{CacheBackend, CacheRecord, Expiry, SetItem};
use crate::error::Result;

// == Null Backend ==
/// Reads always miss, writes are dropped, nothing ever fails.
#[derive(Debug, Clone)]
pub struct NullBackend {
    bin: String,
}

impl NullBackend {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl CacheBackend for NullBackend {
    fn bin(&self) -> &str {
        &self.bin
    }

    fn is_active(&self) -> bool {
        false
    }

    fn get(&self, _cid: &str, _allow_invalid: bool) -> Result<Option<CacheRecord>> {
        Ok(None)
    }

    fn get_multiple(
        &self,
        _cids: &mut Vec<String>,
        _allow_invalid: bool,
    ) -> Result<HashMap<String, CacheRecord>> {
        Ok(HashMap::new())
    }

    fn set(&self, _cid: &str, _data: Value, _expire: Expiry, _tags: &[String]) -> Result<()> {
        Ok(())
    }

    fn set_multiple(&self, _items: Vec<(String, SetItem)>) -> Result<()> {
        Ok(())
    }

    fn delete(&self, _cid: &str) -> Result<()> {
        Ok(())
    }

    fn delete_all(&self) -> Result<()> {
        Ok(())
    }

    fn invalidate(&self, _cid: &str) -> Result<()> {
        Ok(())
    }

    fn invalidate_all(&self) -> Result<()> {
        Ok(())
    }
}
