//! HTTP API handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::{debug, warn};

use crate::metrics;
use crate::store::Store;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Store used for liveness checks.
    pub store: Arc<dyn Store>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state around a store handle.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    /// Expose metrics from `handle` on `GET /metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Reported service health.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::AsRefStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    /// The store answered the liveness check.
    Ok,
    /// The liveness check failed.
    Unhealthy,
}

impl HealthStatus {
    /// HTTP status code for this health status.
    pub fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Ok => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok" or "unhealthy".
    pub status: HealthStatus,
}

/// Health check handler - returns 200 if the store answers, 503 otherwise.
///
/// The ping runs inside the request future, so a client disconnect or a
/// forced shutdown cancels it.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Handling health request");

    let result = {
        let _timer = metrics::timer_store_ping();
        state.store.ping().await
    };

    let status = match result {
        Ok(()) => HealthStatus::Ok,
        Err(e) => {
            warn!(error = %e, "Store liveness check failed");
            HealthStatus::Unhealthy
        }
    };

    metrics::inc_health_checks(status);

    (status.status_code(), Json(HealthResponse { status }))
}

/// Metrics handler - renders Prometheus exposition text, 404 without a recorder.
pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
