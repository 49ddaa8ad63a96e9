//! HTTP server startup and graceful shutdown.
//!
//! The server moves through `Idle → Running → Draining → Stopped`:
//! - **Idle → Running**: the listener is bound ([`Server::bind`]) and starts
//!   accepting connections ([`BoundServer::run`]).
//! - **Running → Draining**: the shutdown token is cancelled. No new
//!   connections are accepted; in-flight requests get the grace period.
//! - **Draining → Stopped**: every connection has finished, or the grace
//!   period expired and the rest were closed. The store is closed last.

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum_server::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ServerError;
use crate::store::Store;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Time in-flight requests get to finish once shutdown starts.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Upper bound on waiting for force-closed connections to be torn down.
const FORCE_CLOSE_SETTLE: Duration = Duration::from_secs(1);

/// Server lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Lifecycle {
    /// Configured, not yet accepting connections.
    Idle,
    /// Accepting and serving requests.
    Running,
    /// Shutdown started, waiting for in-flight requests.
    Draining,
    /// All connections closed and the store released.
    Stopped,
}

/// Outcome of a graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Whether connections were still open when the grace period expired.
    pub forced: bool,
    /// Time from shutdown start to the server stopping.
    pub drain_time: Duration,
}

/// An HTTP server that has not bound its listener yet.
pub struct Server {
    router: Router,
    store: Arc<dyn Store>,
    grace: Duration,
}

impl Server {
    /// Create a server for `router`, closing `store` once it stops.
    pub fn new(router: Router, store: Arc<dyn Store>) -> Self {
        Self {
            router,
            store,
            grace: SHUTDOWN_GRACE_PERIOD,
        }
    }

    /// Override the shutdown grace period.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Bind the listener. Failure here is fatal to startup.
    pub fn bind(self, addr: SocketAddr) -> Result<BoundServer, ServerError> {
        let bind_err = |source| ServerError::Bind { addr, source };

        let listener = TcpListener::bind(addr).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        let (state, _) = watch::channel(Lifecycle::Idle);

        Ok(BoundServer {
            listener,
            local_addr,
            router: self.router,
            store: self.store,
            grace: self.grace,
            state,
        })
    }
}

/// A server with a bound listener, ready to run.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
    store: Arc<dyn Store>,
    grace: Duration,
    state: watch::Sender<Lifecycle>,
}

impl BoundServer {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Watch lifecycle transitions.
    pub fn lifecycle(&self) -> watch::Receiver<Lifecycle> {
        self.state.subscribe()
    }

    /// Serve until `shutdown` is cancelled, then drain and close the store.
    pub async fn run(self, shutdown: CancellationToken) -> Result<ShutdownReport, ServerError> {
        let BoundServer {
            listener,
            local_addr,
            router,
            store,
            grace,
            state,
        } = self;
        let state = Arc::new(state);

        transition(&state, Lifecycle::Running);
        info!(addr = %local_addr, "HTTP server listening");

        let handle = Handle::new();
        let drain = tokio::spawn(watch_shutdown(
            shutdown.clone(),
            handle.clone(),
            grace,
            state.clone(),
        ));

        let served = axum_server::from_tcp(listener)
            .handle(handle.clone())
            .serve(router.into_make_service())
            .await;

        // Connections still counted here were cut off by the grace period.
        let forced = handle.connection_count() > 0;
        if forced {
            warn!(
                error = %ServerError::ShutdownTimeout { grace },
                connections = handle.connection_count(),
                "Grace period expired, closing remaining connections"
            );
            wait_for_connections(&handle, FORCE_CLOSE_SETTLE).await;
        }

        let drain_started = if shutdown.is_cancelled() {
            drain.await.ok()
        } else {
            drain.abort();
            None
        };
        let drain_time = drain_started.map(|t| t.elapsed()).unwrap_or_default();

        store.close().await;
        transition(&state, Lifecycle::Stopped);

        served?;

        info!(
            forced,
            drain_ms = drain_time.as_millis() as u64,
            "HTTP server stopped"
        );

        Ok(ShutdownReport { forced, drain_time })
    }
}

/// Wait for cancellation, then start the graceful shutdown.
async fn watch_shutdown(
    shutdown: CancellationToken,
    handle: Handle,
    grace: Duration,
    state: Arc<watch::Sender<Lifecycle>>,
) -> Instant {
    shutdown.cancelled().await;

    let started = Instant::now();
    transition(&state, Lifecycle::Draining);
    info!(
        grace_secs = grace.as_secs_f64(),
        connections = handle.connection_count(),
        "Stopped accepting connections, draining"
    );
    handle.graceful_shutdown(Some(grace));

    started
}

/// Poll until every connection task has been torn down, or `limit` passes.
async fn wait_for_connections(handle: &Handle, limit: Duration) {
    let deadline = Instant::now() + limit;
    while handle.connection_count() > 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn transition(state: &watch::Sender<Lifecycle>, next: Lifecycle) {
    let previous = state.send_replace(next);
    info!(from = %previous, to = %next, "Server lifecycle transition");
}
