//! Backend Selector Module
//!
//! Builds the shared pool once and hands out one backend per bin: the
//! pool-backed one for bins the settings route to the pool, the null one
//! otherwise.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use crate::cache::{CacheBackend, DevNullPool, NullBackend, PoolBackend, SharedPool};
use crate::drivers::{DriverRegistry, PoolConnector};
use crate::error::{CacheError, Result};
use crate::settings::{Environment, Settings};
use crate::tokens::TokenContext;

// == Surface ==
/// Where a backend is requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Regular application traffic
    Site,
    /// The cache configuration surface; keeps working while caching is
    /// disabled so it can be turned back on
    Admin,
}

// == Failure Mode ==
/// What to do when the pool cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Return the configuration error
    #[default]
    Strict,
    /// Log it and fall back to the discard-everything pool
    Degraded,
}

impl FromStr for FailureMode {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(FailureMode::Strict),
            "degraded" => Ok(FailureMode::Degraded),
            other => Err(CacheError::InvalidRequest(format!(
                "unknown failure mode '{}', expected strict or degraded",
                other
            ))),
        }
    }
}

// == Backend Selector ==
pub struct BackendSelector {
    settings: Settings,
    pool: SharedPool,
    degraded: bool,
    backends: Mutex<HashMap<(Surface, String), Arc<dyn CacheBackend>>>,
}

impl BackendSelector {
    // == Constructor ==
    /// Validates the settings and opens the pool for the default driver.
    ///
    /// Any failure is reported as one configuration error naming the
    /// driver, unless `mode` is [`FailureMode::Degraded`], in which case it
    /// is logged as critical and the selector runs on a [`DevNullPool`].
    pub fn new(
        settings: Settings,
        registry: &DriverRegistry,
        connector: &dyn PoolConnector,
        tokens: TokenContext,
        mode: FailureMode,
    ) -> Result<Self> {
        let (pool, degraded) = match open_pool(&settings, registry, connector, tokens) {
            Ok(pool) => (pool, false),
            Err(e) if mode == FailureMode::Degraded => {
                error!(
                    severity = "critical",
                    driver = %settings.default_driver,
                    error = %e,
                    "Cache pool unavailable, falling back to devnull"
                );
                (Arc::new(DevNullPool) as SharedPool, true)
            }
            Err(e) => return Err(e),
        };

        info!(
            driver = pool.driver_name(),
            enabled = settings.enabled,
            bins = ?settings.bins,
            "Cache pool ready"
        );
        Ok(Self::assemble(settings, pool, degraded))
    }

    /// Selector over an already opened pool.
    pub fn with_pool(settings: Settings, pool: SharedPool) -> Self {
        Self::assemble(settings, pool, false)
    }

    fn assemble(settings: Settings, pool: SharedPool, degraded: bool) -> Self {
        if !settings.enabled {
            let notice = "Caching is disabled; enable it in the cache settings or remove the cache backend override";
            match settings.env {
                Environment::Dev => warn!("{}", notice),
                Environment::Prod => error!("{}", notice),
            }
        }

        Self {
            settings,
            pool,
            degraded,
            backends: Mutex::new(HashMap::new()),
        }
    }

    // == Resolve ==
    /// Backend for `bin` on the regular site surface.
    pub fn resolve(&self, bin: &str) -> Arc<dyn CacheBackend> {
        self.resolve_for(bin, Surface::Site)
    }

    /// Backend for `bin` as seen from `surface`. The same instance is
    /// returned for every call with the same arguments.
    pub fn resolve_for(&self, bin: &str, surface: Surface) -> Arc<dyn CacheBackend> {
        let mut backends = self.backends.lock().unwrap_or_else(PoisonError::into_inner);

        backends
            .entry((surface, bin.to_string()))
            .or_insert_with(|| {
                let backend: Arc<dyn CacheBackend> = if self.uses_pool(bin, surface) {
                    Arc::new(PoolBackend::new(bin, self.pool.clone(), &self.settings.prefix))
                } else {
                    Arc::new(NullBackend::new(bin))
                };
                debug!(bin, ?surface, active = backend.is_active(), "Resolved cache backend");
                backend
            })
            .clone()
    }

    /// Whether `bin` requested from `surface` gets the pool-backed backend.
    pub fn uses_pool(&self, bin: &str, surface: Surface) -> bool {
        if !self.settings.enabled && surface != Surface::Admin {
            return false;
        }
        self.settings.handles_bin(bin)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }

    /// True when running on the fallback pool.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

impl fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelector")
            .field("driver", &self.pool.driver_name())
            .field("enabled", &self.settings.enabled)
            .field("degraded", &self.degraded)
            .finish()
    }
}

fn open_pool(
    settings: &Settings,
    registry: &DriverRegistry,
    connector: &dyn PoolConnector,
    tokens: TokenContext,
) -> Result<SharedPool> {
    settings.validate(registry)?;

    let defaults = settings.pool_defaults(tokens);
    let config = registry.build(&settings.default_driver, settings.driver_options(), &defaults)?;

    connector.connect(&config).map_err(|e| match e {
        CacheError::Configuration { .. } => e,
        other => CacheError::configuration(
            &config.driver,
            format!("failed to open pool: {}", other),
        ),
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Expiry, MemoryPool};
    use crate::drivers::{DriverConfig, LocalConnector};
    use serde_json::json;

    fn settings(enabled: bool, bins: &[&str]) -> Settings {
        Settings {
            enabled,
            prefix: "site".to_string(),
            bins: bins.iter().map(|b| b.to_string()).collect(),
            ..Settings::default()
        }
    }

    fn selector(enabled: bool, bins: &[&str]) -> BackendSelector {
        BackendSelector::with_pool(settings(enabled, bins), Arc::new(MemoryPool::new(100)))
    }

    #[test]
    fn test_wildcard_routes_every_bin() {
        let selector = selector(true, &["default"]);
        assert!(selector.resolve("render").is_active());
        assert!(selector.resolve("anything").is_active());
    }

    #[test]
    fn test_bin_outside_allow_list_gets_null() {
        let selector = selector(true, &["config"]);
        assert!(!selector.resolve("render").is_active());
        assert!(selector.resolve("config").is_active());
    }

    #[test]
    fn test_disabled_routes_every_bin_to_null() {
        let selector = selector(false, &["default"]);
        assert!(!selector.resolve("render").is_active());
        assert!(!selector.resolve("config").is_active());
    }

    #[test]
    fn test_admin_surface_works_while_disabled() {
        let selector = selector(false, &["default"]);
        assert!(selector.resolve_for("config", Surface::Admin).is_active());
        assert!(!selector.resolve_for("config", Surface::Site).is_active());
    }

    #[test]
    fn test_admin_surface_still_honours_allow_list() {
        let selector = selector(false, &["config"]);
        assert!(!selector.resolve_for("render", Surface::Admin).is_active());
    }

    #[test]
    fn test_backends_are_memoized() {
        let selector = selector(true, &["default"]);
        let first = selector.resolve("render");
        let second = selector.resolve("render");
        assert!(Arc::ptr_eq(&first, &second));

        let other = selector.resolve("config");
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_resolved_backends_share_the_pool() {
        let selector = selector(true, &["default"]);
        selector
            .resolve("render")
            .set("k", json!(1), Expiry::Permanent, &[])
            .unwrap();

        assert_eq!(
            selector.resolve("render").get("k", false).unwrap().unwrap().data,
            json!(1)
        );
        assert!(selector.resolve("config").get("k", false).unwrap().is_none());
    }

    #[test]
    fn test_new_opens_configured_driver() {
        let selector = BackendSelector::new(
            settings(true, &["default"]),
            &DriverRegistry::default(),
            &LocalConnector,
            TokenContext::default(),
            FailureMode::Strict,
        )
        .unwrap();

        assert_eq!(selector.pool().driver_name(), "memory");
        assert!(!selector.is_degraded());
    }

    #[test]
    fn test_strict_mode_surfaces_configuration_error() {
        let mut bad = settings(true, &["default"]);
        bad.default_driver = "redis".to_string();

        let err = BackendSelector::new(
            bad,
            &DriverRegistry::default(),
            &LocalConnector,
            TokenContext::default(),
            FailureMode::Strict,
        )
        .unwrap_err();

        match err {
            CacheError::Configuration { driver, .. } => assert_eq!(driver, "redis"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_degraded_mode_falls_back_to_devnull() {
        let mut bad = settings(true, &["default"]);
        bad.prefix = "x".to_string();

        let selector = BackendSelector::new(
            bad,
            &DriverRegistry::default(),
            &LocalConnector,
            TokenContext::default(),
            FailureMode::Degraded,
        )
        .unwrap();

        assert!(selector.is_degraded());
        assert_eq!(selector.pool().driver_name(), "devnull");

        let backend = selector.resolve("render");
        backend.set("k", json!(1), Expiry::Permanent, &[]).unwrap();
        assert!(backend.get("k", false).unwrap().is_none());
    }

    struct RefusingConnector;

    impl PoolConnector for RefusingConnector {
        fn connect(&self, _config: &DriverConfig) -> Result<SharedPool> {
            Err(CacheError::Pool("connection refused".into()))
        }
    }

    #[test]
    fn test_connect_failure_is_attributed_to_driver() {
        let err = BackendSelector::new(
            settings(true, &["default"]),
            &DriverRegistry::default(),
            &RefusingConnector,
            TokenContext::default(),
            FailureMode::Strict,
        )
        .unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("memory"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_failure_mode_from_str() {
        assert_eq!("Degraded".parse::<FailureMode>().unwrap(), FailureMode::Degraded);
        assert_eq!("strict".parse::<FailureMode>().unwrap(), FailureMode::Strict);
        assert!("lenient".parse::<FailureMode>().is_err());
    }
}
