//! API Module
//!
//! HTTP handlers and routing for the cache service REST API.
//!
//! # Endpoints
//! - `GET /tree/:key` - Load a tree (cached-then-revalidate)
//! - `POST /tree/:key/refresh` - Force a revalidation and await it
//! - `PATCH /tree/:key/nodes/:node_id` - Replace a single node
//! - `DELETE /tree/:key` - Invalidate one entry across all tiers
//! - `DELETE /tree` - Clear the entire cache
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
