//! Integration tests for the health-check server.
//!
//! These tests bind a real listener on localhost and talk to it over HTTP,
//! with a mock store standing in for Redis.
//!
//! Run with: cargo test --test integration

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use cicd_server::api::docs::{openapi_spec, swagger_html, SPEC_URL};
use cicd_server::api::{create_router, AppState};
use cicd_server::error::ServerError;
use cicd_server::metrics;
use cicd_server::server::{Lifecycle, Server, ShutdownReport};
use cicd_server::store::{MockStore, Store};

/// A server running in the background.
struct Running {
    addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<Result<ShutdownReport, ServerError>>,
    lifecycle: tokio::sync::watch::Receiver<Lifecycle>,
}

impl Running {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) -> ShutdownReport {
        self.shutdown.cancel();
        self.join().await
    }

    async fn join(self) -> ShutdownReport {
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
            .expect("server returned an error")
    }
}

fn start(store: &MockStore, state: AppState, grace: Duration) -> Running {
    let store: Arc<dyn Store> = Arc::new(store.clone());
    let bound = Server::new(create_router(state), store)
        .with_grace_period(grace)
        .bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .expect("bind localhost");

    let addr = bound.local_addr();
    let lifecycle = bound.lifecycle();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(bound.run(shutdown.clone()));

    Running {
        addr,
        shutdown,
        task,
        lifecycle,
    }
}

fn start_with(store: &MockStore, grace: Duration) -> Running {
    start(store, AppState::new(Arc::new(store.clone())), grace)
}

async fn wait_for_in_flight(store: &MockStore) {
    for _ in 0..200 {
        if store.in_flight() > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("request never reached the store");
}

/// Healthy store: exact 200 body over a real socket.
#[tokio::test]
async fn test_health_ok_over_http() {
    let store = MockStore::new();
    let server = start_with(&store, Duration::from_secs(5));

    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), r#"{"status":"ok"}"#);

    let report = server.stop().await;
    assert!(!report.forced);
    assert!(store.is_closed());
}

/// Failing store: exact 503 body, server keeps serving.
#[tokio::test]
async fn test_health_unhealthy_is_not_fatal() {
    let store = MockStore::failing();
    let server = start_with(&store, Duration::from_secs(5));

    for _ in 0..3 {
        let response = reqwest::get(server.url("/health")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.text().await.unwrap(), r#"{"status":"unhealthy"}"#);
    }
    assert_eq!(*server.lifecycle.borrow(), Lifecycle::Running);

    server.stop().await;
}

/// Docs and spec are served without touching the store.
#[tokio::test]
async fn test_docs_and_spec_over_http() {
    let store = MockStore::failing();
    let server = start_with(&store, Duration::from_secs(5));

    let response = reqwest::get(server.url("/openapi.yaml")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "application/yaml"
    );
    assert_eq!(&response.bytes().await.unwrap()[..], openapi_spec());

    let page = reqwest::get(server.url("/docs/swagger-ui"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(page, swagger_html(SPEC_URL));

    assert_eq!(store.ping_count(), 0);
    server.stop().await;
}

/// A slow request that finishes inside the grace period still gets its answer.
#[tokio::test]
async fn test_in_flight_request_completes_during_drain() {
    let store = MockStore::slow(Duration::from_millis(300));
    let server = start_with(&store, Duration::from_secs(5));

    let request = tokio::spawn(reqwest::get(server.url("/health")));
    wait_for_in_flight(&store).await;

    server.shutdown.cancel();

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), r#"{"status":"ok"}"#);

    let report = server.join().await;
    assert!(!report.forced);
    assert!(report.drain_time < Duration::from_secs(5));
    assert!(store.is_closed());
    assert!(!store.closed_during_ping());
    assert_eq!(store.completed_count(), 1);
}

/// A request slower than the grace period is cut off, and the store is
/// closed only after it was dropped.
#[tokio::test]
async fn test_grace_period_expiry_forces_close() {
    let store = MockStore::slow(Duration::from_secs(30));
    let server = start_with(&store, Duration::from_millis(200));

    let request = tokio::spawn(reqwest::get(server.url("/health")));
    wait_for_in_flight(&store).await;

    server.shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .expect("client should see the connection close")
        .unwrap();
    assert!(result.is_err(), "expected a connection error, got {result:?}");

    let report = server.join().await;
    assert!(report.forced);
    assert!(report.drain_time >= Duration::from_millis(200));
    assert!(store.is_closed());
    assert!(!store.closed_during_ping());
    assert_eq!(store.in_flight(), 0);
    assert_eq!(store.completed_count(), 0);
}

/// Once draining starts, new connections are not served.
#[tokio::test]
async fn test_draining_refuses_new_requests() {
    let store = MockStore::slow(Duration::from_millis(500));
    let server = start_with(&store, Duration::from_secs(5));

    let first = tokio::spawn(reqwest::get(server.url("/health")));
    wait_for_in_flight(&store).await;

    server.shutdown.cancel();
    let mut lifecycle = server.lifecycle.clone();
    lifecycle
        .wait_for(|state| *state == Lifecycle::Draining || *state == Lifecycle::Stopped)
        .await
        .unwrap();

    let late = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap()
        .get(server.url("/health"))
        .send()
        .await;
    assert!(late.is_err(), "late request should not be served");

    let response = first.await.unwrap().unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let report = server.join().await;
    assert!(!report.forced);
    assert_eq!(store.completed_count(), 1);
}

/// With a recorder installed, health probes show up on `/metrics`.
#[tokio::test]
async fn test_metrics_endpoint_counts_health_checks() {
    let handle = metrics::install_recorder().expect("install recorder");

    let store = MockStore::new();
    let state = AppState::new(Arc::new(store.clone())).with_metrics(handle);
    let server = start(&store, state, Duration::from_secs(5));

    reqwest::get(server.url("/health")).await.unwrap();
    store.set_fail_ping(true);
    reqwest::get(server.url("/health")).await.unwrap();

    let body = reqwest::get(server.url("/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(metrics::METRIC_HEALTH_CHECKS));
    assert!(body.contains(r#"status="ok""#));
    assert!(body.contains(r#"status="unhealthy""#));

    server.stop().await;
}
