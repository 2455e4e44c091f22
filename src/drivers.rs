//! Driver Registry Module
//!
//! Maps driver identifiers to typed configuration builders, and turns a
//! built configuration into a pool handle.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::{
    DevNullPool, MemoryPool, SharedPool, DEFAULT_MAX_ENTRIES, DEVNULL_DRIVER, MEMORY_DRIVER,
};
use crate::error::{CacheError, Result};
use crate::tokens::TokenContext;

/// Raw per-driver options as they appear in the settings document.
pub type DriverOptions = Map<String, Value>;

/// Drivers that exist in the storage engine but cannot back a cache.
pub const UNUSABLE_DRIVERS: [&str; 3] = ["cookie", "devfalse", "devtrue"];

// == Typed Options ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryOptions {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOptions {
    /// Storage directory, the system temp dir when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub security_key: Option<String>,
    /// Write a deny-all `.htaccess` next to the files
    #[serde(default)]
    pub htaccess: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemcacheOptions {
    pub host: String,
    #[serde(default = "default_memcache_port")]
    pub port: u16,
    #[serde(default)]
    pub sasl_username: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisOptions {
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    /// Seconds, 0 = unlimited
    #[serde(default)]
    pub timeout: u64,
    #[serde(default, alias = "dbindex")]
    pub database: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MongodbOptions {
    pub host: String,
    #[serde(default = "default_mongodb_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouchbaseOptions {
    pub host: String,
    #[serde(default = "default_couchbase_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub bucket: String,
    #[serde(default)]
    pub bucket_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouchdbOptions {
    pub host: String,
    #[serde(default = "default_couchdb_port")]
    pub port: u16,
    #[serde(default = "default_couchdb_path")]
    pub path: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiakOptions {
    pub host: String,
    #[serde(default = "default_riak_port")]
    pub port: u16,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub bucket_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsdbOptions {
    pub host: String,
    #[serde(default = "default_ssdb_port")]
    pub port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}
fn default_memcache_port() -> u16 {
    11211
}
fn default_redis_port() -> u16 {
    6379
}
fn default_mongodb_port() -> u16 {
    27017
}
fn default_couchbase_port() -> u16 {
    8091
}
fn default_couchdb_port() -> u16 {
    5984
}
fn default_couchdb_path() -> String {
    "/".to_string()
}
fn default_riak_port() -> u16 {
    8098
}
fn default_ssdb_port() -> u16 {
    8888
}
fn default_timeout() -> u64 {
    3
}

// == Driver Config ==
/// Driver-specific part of a [`DriverConfig`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DriverKind {
    /// Driver without options (apcu, devnull, ...)
    Bare,
    Memory(MemoryOptions),
    Files(FileOptions),
    Memcache(MemcacheOptions),
    Redis(RedisOptions),
    Mongodb(MongodbOptions),
    Couchbase(CouchbaseOptions),
    Couchdb(CouchdbOptions),
    Riak(RiakOptions),
    Ssdb(SsdbOptions),
}

/// Validated, typed configuration for one driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverConfig {
    pub driver: String,
    /// Lifetime for items saved without an expiry
    pub default_ttl: i64,
    pub kind: DriverKind,
}

/// Settings-wide values every builder may use.
#[derive(Debug, Clone)]
pub struct PoolDefaults {
    pub default_ttl: i64,
    pub htaccess: bool,
    pub tokens: TokenContext,
}

impl Default for PoolDefaults {
    fn default() -> Self {
        Self {
            default_ttl: 900,
            htaccess: true,
            tokens: TokenContext::default(),
        }
    }
}

/// Builds the typed part of a driver's configuration from raw options.
pub type ConfigBuilder = fn(&str, &DriverOptions, &PoolDefaults) -> Result<DriverKind>;

// == Builders ==
fn build_bare(_driver: &str, _options: &DriverOptions, _defaults: &PoolDefaults) -> Result<DriverKind> {
    Ok(DriverKind::Bare)
}

fn build_memory(driver: &str, options: &DriverOptions, _defaults: &PoolDefaults) -> Result<DriverKind> {
    let options: MemoryOptions = parse_options(driver, options)?;
    if options.max_entries == 0 {
        return Err(CacheError::configuration(driver, "max_entries must be at least 1"));
    }
    Ok(DriverKind::Memory(options))
}

fn build_files(driver: &str, options: &DriverOptions, defaults: &PoolDefaults) -> Result<DriverKind> {
    let mut raw = options.clone();
    raw.entry("htaccess")
        .or_insert_with(|| Value::Bool(defaults.htaccess));
    let mut options: FileOptions = parse_options(driver, &raw)?;
    if options.path.is_none() {
        options.path = Some(std::env::temp_dir());
    }
    Ok(DriverKind::Files(options))
}

fn build_memcache(driver: &str, options: &DriverOptions, _defaults: &PoolDefaults) -> Result<DriverKind> {
    let options: MemcacheOptions = parse_options(driver, options)?;
    require_host(driver, &options.host)?;
    Ok(DriverKind::Memcache(options))
}

fn build_redis(driver: &str, options: &DriverOptions, _defaults: &PoolDefaults) -> Result<DriverKind> {
    let options: RedisOptions = parse_options(driver, options)?;
    require_host(driver, &options.host)?;
    Ok(DriverKind::Redis(options))
}

fn build_mongodb(driver: &str, options: &DriverOptions, _defaults: &PoolDefaults) -> Result<DriverKind> {
    let options: MongodbOptions = parse_options(driver, options)?;
    require_host(driver, &options.host)?;
    Ok(DriverKind::Mongodb(options))
}

fn build_couchbase(driver: &str, options: &DriverOptions, _defaults: &PoolDefaults) -> Result<DriverKind> {
    let options: CouchbaseOptions = parse_options(driver, options)?;
    require_host(driver, &options.host)?;
    if options.bucket.trim().is_empty() {
        return Err(CacheError::configuration(driver, "bucket is required"));
    }
    Ok(DriverKind::Couchbase(options))
}

fn build_couchdb(driver: &str, options: &DriverOptions, _defaults: &PoolDefaults) -> Result<DriverKind> {
    let options: CouchdbOptions = parse_options(driver, options)?;
    require_host(driver, &options.host)?;
    Ok(DriverKind::Couchdb(options))
}

fn build_riak(driver: &str, options: &DriverOptions, _defaults: &PoolDefaults) -> Result<DriverKind> {
    let options: RiakOptions = parse_options(driver, options)?;
    require_host(driver, &options.host)?;
    Ok(DriverKind::Riak(options))
}

fn build_ssdb(driver: &str, options: &DriverOptions, _defaults: &PoolDefaults) -> Result<DriverKind> {
    let options: SsdbOptions = parse_options(driver, options)?;
    require_host(driver, &options.host)?;
    Ok(DriverKind::Ssdb(options))
}

fn parse_options<T: DeserializeOwned>(driver: &str, options: &DriverOptions) -> Result<T> {
    // Empty strings come from blank form fields; treat them as unset
    let cleaned: DriverOptions = options
        .iter()
        .filter(|(_, value)| !matches!(value, Value::String(s) if s.is_empty()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    serde_json::from_value(Value::Object(cleaned))
        .map_err(|e| CacheError::configuration(driver, e.to_string()))
}

fn require_host(driver: &str, host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(CacheError::configuration(driver, "host is required"));
    }
    Ok(())
}

fn substitute_tokens(options: &DriverOptions, tokens: &TokenContext) -> DriverOptions {
    options
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => Value::String(tokens.substitute(s)),
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

// == Driver Registry ==
/// Driver identifier → typed configuration builder.
#[derive(Clone)]
pub struct DriverRegistry {
    builders: BTreeMap<String, ConfigBuilder>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.builders.keys()).finish()
    }
}

impl DriverRegistry {
    /// Registry without any driver.
    pub fn empty() -> Self {
        Self {
            builders: BTreeMap::new(),
        }
    }

    /// Adds or replaces a driver.
    pub fn register(&mut self, driver: &str, builder: ConfigBuilder) -> &mut Self {
        self.builders.insert(driver.to_ascii_lowercase(), builder);
        self
    }

    pub fn is_usable(&self, driver: &str) -> bool {
        let driver = driver.to_ascii_lowercase();
        self.builders.contains_key(&driver) && !UNUSABLE_DRIVERS.contains(&driver.as_str())
    }

    /// Known drivers minus [`UNUSABLE_DRIVERS`], sorted.
    pub fn usable_drivers(&self) -> Vec<String> {
        self.builders
            .keys()
            .filter(|name| !UNUSABLE_DRIVERS.contains(&name.as_str()))
            .cloned()
            .collect()
    }

    // == Build ==
    /// Substitutes tokens in `options` and builds the typed configuration
    /// for `driver`.
    pub fn build(
        &self,
        driver: &str,
        options: Option<&DriverOptions>,
        defaults: &PoolDefaults,
    ) -> Result<DriverConfig> {
        let name = driver.to_ascii_lowercase();
        if !self.is_usable(&name) {
            return Err(CacheError::configuration(driver, "the driver chosen is unavailable"));
        }
        let builder = self.builders[&name];

        let empty = DriverOptions::new();
        let options = substitute_tokens(options.unwrap_or(&empty), &defaults.tokens);
        let kind = builder(&name, &options, defaults)?;

        Ok(DriverConfig {
            driver: name,
            default_ttl: defaults.default_ttl,
            kind,
        })
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for bare in ["apc", "apcu", DEVNULL_DRIVER, "wincache", "xcache", "zenddisk", "zendshm"] {
            registry.register(bare, build_bare);
        }
        registry
            .register(MEMORY_DRIVER, build_memory)
            .register("files", build_files)
            .register("sqlite", build_files)
            .register("leveldb", build_files)
            .register("memcache", build_memcache)
            .register("memcached", build_memcache)
            .register("redis", build_redis)
            .register("predis", build_redis)
            .register("mongodb", build_mongodb)
            .register("couchbase", build_couchbase)
            .register("couchdb", build_couchdb)
            .register("riak", build_riak)
            .register("ssdb", build_ssdb);
        registry
    }
}

// == Pool Connector ==
/// Opens a pool for a built driver configuration.
pub trait PoolConnector: Send + Sync {
    fn connect(&self, config: &DriverConfig) -> Result<SharedPool>;
}

/// Connector for the in-process drivers (`memory`, `devnull`).
///
/// Remote drivers need a connector supplied by the embedding application.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalConnector;

impl PoolConnector for LocalConnector {
    fn connect(&self, config: &DriverConfig) -> Result<SharedPool> {
        match &config.kind {
            DriverKind::Memory(options) => Ok(Arc::new(
                MemoryPool::new(options.max_entries).with_default_ttl(config.default_ttl),
            )),
            DriverKind::Bare if config.driver == DEVNULL_DRIVER => Ok(Arc::new(DevNullPool)),
            _ => Err(CacheError::configuration(
                &config.driver,
                "driver is not available in this build",
            )),
        }
    }
}
