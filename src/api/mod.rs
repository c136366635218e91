//! API Module
//!
//! HTTP handlers and routing for the demo server.
//!
//! # Endpoints
//! - `GET /clock` - Current time, served through the response cache
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Store statistics
//! - `DELETE /admin/cache/*key` - Invalidate one cache key

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
