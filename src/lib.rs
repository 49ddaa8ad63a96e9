//! Health-check HTTP service backed by a Redis liveness probe.
//!
//! The service answers `GET /health` with `{"status":"ok"}` when Redis
//! replies to `PING` and `{"status":"unhealthy"}` (HTTP 503) otherwise. It
//! also serves its own OpenAPI document and a Swagger UI page.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from a YAML `config` file
//! - [`error`]: Error types
//! - [`store`]: Store handle and liveness checks
//! - [`api`]: HTTP handlers, embedded docs, and routes
//! - [`server`]: Listener binding and graceful shutdown
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Signal handling

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{ConfigError, ServerError, StoreError};
