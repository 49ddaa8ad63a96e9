//! Key-value store access for liveness checks.
//!
//! This module handles:
//! - The `Store` trait shared by request handlers
//! - The Redis-backed implementation
//! - A mock store for testing

pub mod client;
pub mod mock;

use async_trait::async_trait;

use crate::error::StoreError;

pub use client::RedisStore;
pub use mock::{MockStore, MockStoreConfig};

/// A store that can answer liveness checks.
///
/// Implementations are shared read-only across concurrent handlers.
#[async_trait]
pub trait Store: Send + Sync {
    /// One liveness round-trip to the store.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Release the underlying connection.
    ///
    /// Called once during shutdown, after the server has stopped. Later
    /// pings fail with [`StoreError::Closed`].
    async fn close(&self);
}
