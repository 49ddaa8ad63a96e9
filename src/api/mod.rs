//! HTTP API module for health, documentation, and metrics endpoints.

pub mod docs;
pub mod handlers;
pub mod routes;

pub use handlers::{AppState, HealthResponse, HealthStatus};
pub use routes::create_router;
