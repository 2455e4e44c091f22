//! Cache Module
//!
//! Per-bin cache backends over a shared storage pool: key normalization,
//! the stored record envelope, the pool contract with its in-process
//! drivers, and the selector that picks a backend for each bin.

mod backend;
mod devnull;
mod key;
mod lru;
mod memory;
mod null;
mod pool;
mod record;
mod selector;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::{CacheBackend, PoolBackend, SetItem};
pub use devnull::{DevNullPool, DEVNULL_DRIVER};
pub use key::{hash_base64, hash_length, KeyNormalizer, BIN_NAMESPACE, DEFAULT_SITE_PREFIX, RESERVED_CHARS};
pub use lru::LruTracker;
pub use memory::{MemoryPool, DEFAULT_MAX_ENTRIES, MEMORY_DRIVER};
pub use null::NullBackend;
pub use pool::{CachePool, PoolItem, SharedPool};
pub use record::{CacheRecord, Expiry, PERMANENT, PERMANENT_TTL_SECS, TIMESTAMP_THRESHOLD};
pub use selector::{BackendSelector, FailureMode, Surface};
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum length of a pool key in bytes
pub const MAX_KEY_LENGTH: usize = 64;
