//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer and its HTTP surface.
///
/// A cache miss is not an error: the backend contract returns `Option`.
/// `NotFound` only exists so HTTP handlers can answer 404.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid or missing driver/settings parameters, detected when the
    /// pool is built or the settings document is validated
    #[error("Configuration error for driver '{driver}': {message}")]
    Configuration { driver: String, message: String },

    /// An individual call to the pool failed
    #[error("Pool error: {0}")]
    Pool(String),

    /// Key not found (HTTP surface only)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Shorthand for a configuration error attributed to `driver`.
    pub fn configuration(driver: impl Into<String>, message: impl Into<String>) -> Self {
        CacheError::Configuration {
            driver: driver.into(),
            message: message.into(),
        }
    }

    /// True for errors raised while building a pool or validating settings.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CacheError::Configuration { .. })
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Configuration { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Pool(_) => StatusCode::BAD_GATEWAY,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
