//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_all_handler, delete_handler, delete_multiple_handler, drivers_handler, get_handler,
    health_handler, invalidate_all_handler, invalidate_handler, invalidate_multiple_handler,
    lookup_handler, set_handler, set_multiple_handler, settings_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT|GET|DELETE /bins/:bin/items/:cid` - Single item operations
/// - `POST /bins/:bin/items/:cid/invalidate` - Invalidate one item
/// - `POST /bins/:bin/items` - Store several items
/// - `POST /bins/:bin/lookup` - Fetch several items, reporting misses
/// - `POST /bins/:bin/delete` - Delete several items
/// - `POST /bins/:bin/invalidate` - Invalidate several items
/// - `DELETE /bins/:bin` - Clear the pool
/// - `POST /bins/:bin/invalidate-all` - Invalidate the pool
/// - `GET /stats` - Pool statistics
/// - `GET /health` - Health check endpoint
/// - `GET /admin/settings` - Redacted cache settings
/// - `GET /admin/drivers` - Usable driver identifiers
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let bins = Router::new()
        .route(
            "/:bin/items/:cid",
            put(set_handler).get(get_handler).delete(delete_handler),
        )
        .route("/:bin/items/:cid/invalidate", post(invalidate_handler))
        .route("/:bin/items", post(set_multiple_handler))
        .route("/:bin/lookup", post(lookup_handler))
        .route("/:bin/delete", post(delete_multiple_handler))
        .route("/:bin/invalidate", post(invalidate_multiple_handler))
        .route("/:bin/invalidate-all", post(invalidate_all_handler))
        .route("/:bin", delete(delete_all_handler));

    let admin = Router::new()
        .route("/settings", get(settings_handler))
        .route("/drivers", get(drivers_handler));

    Router::new()
        .nest("/bins", bins)
        .nest("/admin", admin)
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
