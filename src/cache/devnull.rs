//! DevNull Pool Module
//!
//! Discard-everything pool, used as the degraded-mode fallback.

use crate::cache::{CachePool, PoolItem};
use crate::error::Result;

pub const DEVNULL_DRIVER: &str = "devnull";

// == DevNull Pool ==
#[derive(Debug, Default, Clone, Copy)]
pub struct DevNullPool;

impl CachePool for DevNullPool {
    fn driver_name(&self) -> &str {
        DEVNULL_DRIVER
    }

    fn get_item(&self, key: &str) -> Result<PoolItem> {
        Ok(PoolItem::miss(key))
    }

    fn save(&self, _item: PoolItem) -> Result<()> {
        Ok(())
    }

    fn delete_item(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}
