//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Every bin route
//! resolves its backend through the shared [`BackendSelector`].

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::debug;

use crate::cache::{BackendSelector, CacheBackend, Expiry, Surface};
use crate::drivers::DriverRegistry;
use crate::error::{CacheError, Result};
use crate::models::requests::{validate_bin, validate_cid};
use crate::settings::Settings;
use crate::models::{
    AckResponse, CidsRequest, DriversResponse, GetQuery, GetResponse, HealthResponse,
    LookupRequest, LookupResponse, SetMultipleRequest, SetRequest, SettingsResponse,
    StatsResponse,
};

/// Bin the configuration surface caches its own data in
pub const ADMIN_BIN: &str = "config";

/// Cache id of the redacted settings document in [`ADMIN_BIN`]
pub const SETTINGS_CID: &str = "admin.settings";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub selector: Arc<BackendSelector>,
    /// Usable driver identifiers, computed once at startup
    pub drivers: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(selector: BackendSelector, registry: &DriverRegistry) -> Self {
        Self {
            selector: Arc::new(selector),
            drivers: Arc::new(registry.usable_drivers()),
        }
    }

    /// Validated backend for a bin route.
    fn backend(&self, bin: &str) -> Result<Arc<dyn CacheBackend>> {
        if let Some(error_msg) = validate_bin(bin) {
            return Err(CacheError::InvalidRequest(error_msg));
        }
        Ok(self.selector.resolve(bin))
    }
}

fn check_cids(cids: &[String]) -> Result<()> {
    match cids.iter().find_map(|cid| validate_cid(cid)) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

// == Item Handlers ==
/// Handler for PUT /bins/:bin/items/:cid
pub async fn set_handler(
    State(state): State<AppState>,
    Path((bin, cid)): Path<(String, String)>,
    Json(req): Json<SetRequest>,
) -> Result<Json<AckResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let backend = state.backend(&bin)?;
    backend.set(&cid, req.data, req.expire, &req.tags)?;

    Ok(Json(AckResponse::new(bin, backend.is_active(), format!("Stored '{}'", cid))))
}

/// Handler for GET /bins/:bin/items/:cid
///
/// Answers 404 for absent ids, and for invalidated ones unless
/// `allow_invalid=true` is passed.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((bin, cid)): Path<(String, String)>,
    Query(query): Query<GetQuery>,
) -> Result<Json<GetResponse>> {
    let backend = state.backend(&bin)?;

    match backend.get(&cid, query.allow_invalid)? {
        Some(record) => Ok(Json(GetResponse::new(bin, record))),
        None => Err(CacheError::NotFound(cid)),
    }
}

/// Handler for DELETE /bins/:bin/items/:cid
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((bin, cid)): Path<(String, String)>,
) -> Result<Json<AckResponse>> {
    let backend = state.backend(&bin)?;
    backend.delete(&cid)?;

    Ok(Json(AckResponse::new(bin, backend.is_active(), format!("Deleted '{}'", cid))))
}

/// Handler for POST /bins/:bin/items/:cid/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path((bin, cid)): Path<(String, String)>,
) -> Result<Json<AckResponse>> {
    let backend = state.backend(&bin)?;
    backend.invalidate(&cid)?;

    Ok(Json(AckResponse::new(bin, backend.is_active(), format!("Invalidated '{}'", cid))))
}

// == Batch Handlers ==
/// Handler for POST /bins/:bin/lookup
pub async fn lookup_handler(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<LookupResponse>> {
    check_cids(&req.cids)?;
    let backend = state.backend(&bin)?;

    let mut cids = req.cids;
    let items = backend.get_multiple(&mut cids, req.allow_invalid)?;
    debug!(bin = %bin, hits = items.len(), misses = cids.len(), "Lookup");

    Ok(Json(LookupResponse::new(items, cids)))
}

/// Handler for POST /bins/:bin/items
pub async fn set_multiple_handler(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    Json(req): Json<SetMultipleRequest>,
) -> Result<Json<AckResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let backend = state.backend(&bin)?;
    let count = req.items.len();
    backend.set_multiple(req.items.into_iter().collect())?;

    Ok(Json(AckResponse::new(bin, backend.is_active(), format!("Stored {} items", count))))
}

/// Handler for POST /bins/:bin/delete
pub async fn delete_multiple_handler(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    Json(req): Json<CidsRequest>,
) -> Result<Json<AckResponse>> {
    check_cids(&req.cids)?;
    let backend = state.backend(&bin)?;
    backend.delete_multiple(&req.cids)?;

    Ok(Json(AckResponse::new(
        bin,
        backend.is_active(),
        format!("Deleted {} items", req.cids.len()),
    )))
}

/// Handler for POST /bins/:bin/invalidate
pub async fn invalidate_multiple_handler(
    State(state): State<AppState>,
    Path(bin): Path<String>,
    Json(req): Json<CidsRequest>,
) -> Result<Json<AckResponse>> {
    check_cids(&req.cids)?;
    let backend = state.backend(&bin)?;
    backend.invalidate_multiple(&req.cids)?;

    Ok(Json(AckResponse::new(
        bin,
        backend.is_active(),
        format!("Invalidated {} items", req.cids.len()),
    )))
}

/// Handler for DELETE /bins/:bin
///
/// The pool is shared, so this clears every bin it holds.
pub async fn delete_all_handler(
    State(state): State<AppState>,
    Path(bin): Path<String>,
) -> Result<Json<AckResponse>> {
    let backend = state.backend(&bin)?;
    backend.delete_all()?;

    Ok(Json(AckResponse::new(bin, backend.is_active(), "Cleared pool")))
}

/// Handler for POST /bins/:bin/invalidate-all
pub async fn invalidate_all_handler(
    State(state): State<AppState>,
    Path(bin): Path<String>,
) -> Result<Json<AckResponse>> {
    let backend = state.backend(&bin)?;
    backend.invalidate_all()?;

    Ok(Json(AckResponse::new(bin, backend.is_active(), "Invalidated pool")))
}

// == Server Handlers ==
/// Handler for GET /stats
///
/// Pools that keep no statistics report zeros.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let pool = state.selector.pool();

    Json(StatsResponse::new(
        pool.driver_name(),
        state.selector.is_degraded(),
        pool.stats(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Admin Handlers ==
/// Handler for GET /admin/settings
///
/// The redacted document is cached in [`ADMIN_BIN`] through the admin
/// surface, so it stays cached while caching is disabled for the site.
pub async fn settings_handler(State(state): State<AppState>) -> Result<Json<SettingsResponse>> {
    let selector = &state.selector;
    let backend = selector.resolve_for(ADMIN_BIN, Surface::Admin);

    let cached = backend
        .get(SETTINGS_CID, false)?
        .and_then(|record| serde_json::from_value::<Settings>(record.data).ok());
    let from_cache = cached.is_some();

    let settings = match cached {
        Some(settings) => settings,
        None => {
            let redacted = selector.settings().redacted();
            let data = serde_json::to_value(&redacted)
                .map_err(|e| CacheError::Internal(format!("cannot serialize settings: {}", e)))?;
            backend.set(SETTINGS_CID, data, Expiry::Raw(redacted.default_ttl), &[])?;
            redacted
        }
    };

    Ok(Json(SettingsResponse {
        settings,
        driver: selector.pool().driver_name().to_string(),
        degraded: selector.is_degraded(),
        admin_cache_active: backend.is_active(),
        from_cache,
    }))
}

/// Handler for GET /admin/drivers
pub async fn drivers_handler(State(state): State<AppState>) -> Json<DriversResponse> {
    Json(DriversResponse {
        drivers: state.drivers.as_ref().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryPool;
    use serde_json::json;

    fn state(enabled: bool) -> AppState {
        let settings = Settings {
            enabled,
            prefix: "test".to_string(),
            ..Settings::default()
        };
        let selector = BackendSelector::with_pool(settings, Arc::new(MemoryPool::new(100)));
        AppState::new(selector, &DriverRegistry::default())
    }

    fn path(bin: &str, cid: &str) -> Path<(String, String)> {
        Path((bin.to_string(), cid.to_string()))
    }

    fn set_request(data: serde_json::Value) -> SetRequest {
        SetRequest {
            data,
            expire: Expiry::Permanent,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = state(true);

        let result = set_handler(
            State(state.clone()),
            path("render", "page:1"),
            Json(set_request(json!({"html": "<p>hi</p>"}))),
        )
        .await
        .unwrap();
        assert!(result.0.cached);

        let result = get_handler(
            State(state),
            path("render", "page:1"),
            Query(GetQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(result.0.record.data, json!({"html": "<p>hi</p>"}));
        assert_eq!(result.0.bin, "render");
    }

    #[tokio::test]
    async fn test_get_handler_not_found() {
        let result = get_handler(
            State(state(true)),
            path("render", "missing"),
            Query(GetQuery::default()),
        )
        .await;

        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalidated_item_needs_allow_invalid() {
        let state = state(true);
        set_handler(State(state.clone()), path("render", "k"), Json(set_request(json!(1))))
            .await
            .unwrap();
        invalidate_handler(State(state.clone()), path("render", "k"))
            .await
            .unwrap();

        let strict = get_handler(
            State(state.clone()),
            path("render", "k"),
            Query(GetQuery::default()),
        )
        .await;
        assert!(matches!(strict, Err(CacheError::NotFound(_))));

        let stale = get_handler(
            State(state),
            path("render", "k"),
            Query(GetQuery { allow_invalid: true }),
        )
        .await
        .unwrap();
        assert!(!stale.0.record.valid);
    }

    #[tokio::test]
    async fn test_delete_handler_is_idempotent() {
        let state = state(true);
        assert!(delete_handler(State(state.clone()), path("render", "nope")).await.is_ok());
        assert!(delete_handler(State(state), path("render", "nope")).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_bin_rejected() {
        let result = delete_handler(State(state(true)), path("bad.bin", "k")).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_lookup_rejects_empty_cid() {
        let req = LookupRequest {
            cids: vec!["a".to_string(), String::new()],
            allow_invalid: false,
        };
        let result = lookup_handler(State(state(true)), Path("render".to_string()), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_disabled_cache_acknowledges_without_storing() {
        let state = state(false);
        let ack = set_handler(State(state.clone()), path("render", "k"), Json(set_request(json!(1))))
            .await
            .unwrap();
        assert!(!ack.0.cached);

        let result = get_handler(State(state), path("render", "k"), Query(GetQuery::default())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_settings_handler_caches_through_admin_surface() {
        let state = state(false);

        let first = settings_handler(State(state.clone())).await.unwrap();
        assert!(first.0.admin_cache_active);
        assert!(!first.0.from_cache);
        assert!(!first.0.settings.enabled);
        assert_eq!(first.0.driver, "memory");

        let second = settings_handler(State(state.clone())).await.unwrap();
        assert!(second.0.from_cache);
        assert_eq!(second.0.settings, first.0.settings);

        // Stored in the admin bin, invisible from the site surface while disabled
        let admin = state.selector.resolve_for(ADMIN_BIN, Surface::Admin);
        assert!(admin.get(SETTINGS_CID, false).unwrap().is_some());
        assert!(state.selector.resolve(ADMIN_BIN).get(SETTINGS_CID, false).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settings_handler_without_admin_cache() {
        let settings = Settings {
            enabled: true,
            prefix: "test".to_string(),
            bins: vec!["render".to_string()],
            ..Settings::default()
        };
        let selector = BackendSelector::with_pool(settings, Arc::new(MemoryPool::new(100)));
        let state = AppState::new(selector, &DriverRegistry::default());

        settings_handler(State(state.clone())).await.unwrap();
        let second = settings_handler(State(state)).await.unwrap();
        assert!(!second.0.admin_cache_active);
        assert!(!second.0.from_cache);
    }

    #[tokio::test]
    async fn test_drivers_handler_lists_usable_drivers() {
        let response = drivers_handler(State(state(true))).await;
        assert!(response.0.drivers.contains(&"memory".to_string()));
        assert!(!response.0.drivers.contains(&"cookie".to_string()));
    }
}
