//! Prometheus metrics for health probes.
//!
//! This module provides:
//! - Health check outcome counters
//! - Store ping latency
//! - The Prometheus recorder rendered by `GET /metrics`

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

use crate::api::HealthStatus;

// === Metric Name Constants ===

/// Health checks counter metric name, labelled by `status`.
pub const METRIC_HEALTH_CHECKS: &str = "health_checks_total";
/// Store ping latency metric name.
pub const METRIC_STORE_PING_LATENCY: &str = "store_ping_latency_ms";

/// Install the global Prometheus recorder and describe all metrics.
///
/// Call this once at startup. The returned handle renders the exposition
/// text for `GET /metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    describe_counter!(
        METRIC_HEALTH_CHECKS,
        "Total number of health checks, by reported status"
    );
    describe_histogram!(
        METRIC_STORE_PING_LATENCY,
        "Store liveness round-trip latency in milliseconds"
    );

    debug!("Metrics initialized");
}

/// Increment the health check counter for `status`.
pub fn inc_health_checks(status: HealthStatus) {
    counter!(METRIC_HEALTH_CHECKS, "status" => status.as_ref().to_string()).increment(1);
}

/// RAII guard for timing operations.
/// Records latency when dropped, so cancelled operations are still counted.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for a store ping.
pub fn timer_store_ping() -> LatencyTimer {
    LatencyTimer::new(METRIC_STORE_PING_LATENCY)
}
