//! Mock store for unit and integration testing.
//!
//! This module provides a store that answers liveness checks without making
//! network requests, with configurable failure and latency.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

use super::Store;

/// Configuration for mock store behavior.
#[derive(Debug, Clone, Default)]
pub struct MockStoreConfig {
    /// Whether pings fail.
    pub fail_ping: bool,
    /// Simulated round-trip latency in milliseconds.
    pub latency_ms: u64,
}

/// Mock store for testing.
///
/// Clones share state, so a test can keep one clone for assertions while the
/// router owns another.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    config: Arc<Mutex<MockStoreConfig>>,
    pings: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    closed_during_ping: Arc<AtomicBool>,
}

impl MockStore {
    /// Create a healthy mock store with no latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store with custom configuration.
    pub fn with_config(config: MockStoreConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            ..Self::default()
        }
    }

    /// A store whose pings always fail.
    pub fn failing() -> Self {
        Self::with_config(MockStoreConfig {
            fail_ping: true,
            ..Default::default()
        })
    }

    /// A healthy store that takes `latency` to answer.
    pub fn slow(latency: Duration) -> Self {
        Self::with_config(MockStoreConfig {
            latency_ms: latency.as_millis() as u64,
            ..Default::default()
        })
    }

    /// Toggle ping failure at runtime.
    pub fn set_fail_ping(&self, fail: bool) {
        self.lock_config().fail_ping = fail;
    }

    /// Number of pings started.
    pub fn ping_count(&self) -> u64 {
        self.pings.load(Ordering::SeqCst)
    }

    /// Number of pings that ran to completion (success or failure).
    pub fn completed_count(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Number of pings currently awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether `close` was called while a ping was still in flight.
    pub fn closed_during_ping(&self) -> bool {
        self.closed_during_ping.load(Ordering::SeqCst)
    }

    fn lock_config(&self) -> std::sync::MutexGuard<'_, MockStoreConfig> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decrements the in-flight counter on drop, including when the ping future
/// is cancelled.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MockStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.pings.fetch_add(1, Ordering::SeqCst);

        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        let _guard = InFlightGuard::enter(&self.in_flight);
        let config = self.lock_config().clone();

        if config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.latency_ms)).await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);

        if config.fail_ping {
            return Err(StoreError::Unexpected("mock ping failure".to_string()));
        }

        Ok(())
    }

    async fn close(&self) {
        if self.in_flight() > 0 {
            self.closed_during_ping.store(true, Ordering::SeqCst);
        }
        self.closed.store(true, Ordering::SeqCst);
    }
}
