//! Bincache - per-bin cache backends over a shared storage pool
//!
//! Resolves a cache backend for every named bin, normalizes cache ids into
//! bounded pool keys, and serves the backend contract over HTTP.

pub mod api;
pub mod cache;
pub mod config;
pub mod drivers;
pub mod error;
pub mod models;
pub mod settings;
pub mod tasks;
pub mod tokens;

pub use api::AppState;
pub use cache::{BackendSelector, CacheBackend, FailureMode, Surface};
pub use config::Config;
pub use drivers::{DriverRegistry, LocalConnector, PoolConnector};
pub use error::{CacheError, Result};
pub use settings::Settings;
pub use tasks::spawn_purge_task;
pub use tokens::TokenContext;
