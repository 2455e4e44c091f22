//! API Module
//!
//! HTTP handlers and routing for the bin cache REST API.
//!
//! # Endpoints
//! - `/bins/:bin/...` - Backend operations for one bin
//! - `GET /stats` - Pool statistics
//! - `GET /health` - Health check endpoint
//! - `/admin/...` - Configuration surface

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
