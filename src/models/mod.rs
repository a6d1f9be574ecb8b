//! API Models Module
//!
//! Request and response DTOs for the cache service REST API.

pub mod requests;
pub mod responses;

pub use requests::UpdateNodeRequest;
pub use responses::{
    HealthResponse, InvalidateResponse, StatsResponse, TreeResponse, UpdateNodeResponse,
};
