//! Redis-backed store handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::RedisConfig;
use crate::error::StoreError;

use super::Store;

/// Port used when the address has none.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Timeout for establishing the TCP connection.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a single command round-trip.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

/// Long-lived Redis handle.
///
/// Creating it does no network work. The first [`Store::ping`] establishes an
/// auto-reconnecting [`ConnectionManager`]; if that fails the next ping tries
/// again. Connection attempts are not retried within a ping: a liveness probe
/// reports the first failure.
pub struct RedisStore {
    client: Client,
    addr: String,
    conn: Mutex<Option<ConnectionManager>>,
    closed: AtomicBool,
}

impl RedisStore {
    /// Build a handle for the configured endpoint.
    pub fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let (host, port) = parse_addr(&config.addr)?;

        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(host, port),
            redis: RedisConnectionInfo {
                db: config.db,
                password: config.has_password().then(|| config.password.clone()),
                ..Default::default()
            },
        };

        let client = Client::open(info)?;

        debug!(addr = %config.addr, db = config.db, "Created redis client");

        Ok(Self {
            client,
            addr: config.addr.clone(),
            conn: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Configured address, for logging.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Shared connection, establishing it if needed.
    ///
    /// The lock is only held to read or publish the slot, never across the
    /// connect, so concurrent pings fail or succeed independently. When two
    /// callers race to connect, the first one published wins.
    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        {
            let guard = self.conn.lock().await;
            if self.closed.load(Ordering::Acquire) {
                return Err(StoreError::Closed);
            }
            if let Some(conn) = guard.as_ref() {
                return Ok(conn.clone());
            }
        }

        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(CONNECTION_TIMEOUT)
            .set_response_timeout(RESPONSE_TIMEOUT)
            .set_number_of_retries(0);
        let conn = ConnectionManager::new_with_config(self.client.clone(), config).await?;

        let mut guard = self.conn.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        match guard.as_ref() {
            Some(existing) => Ok(existing.clone()),
            None => {
                info!(addr = %self.addr, "Connected to redis");
                *guard = Some(conn.clone());
                Ok(conn)
            }
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;

        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(StoreError::Unexpected(reply));
        }

        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if self.conn.lock().await.take().is_some() {
            info!(addr = %self.addr, "Closed redis connection");
        }
    }
}

/// Split `host[:port]` into its parts. Bracketed IPv6 hosts are accepted.
pub fn parse_addr(addr: &str) -> Result<(String, u16), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidAddress {
        addr: addr.to_string(),
        reason: reason.to_string(),
    };

    let addr = addr.trim();
    let (host, port) = match addr.rsplit_once(':') {
        Some(_) if addr.ends_with(']') => (addr, None),
        // A bare IPv6 address has colons but no port.
        Some((host, _)) if host.contains(':') && !host.starts_with('[') => (addr, None),
        Some((host, port)) => (host, Some(port)),
        None => (addr, None),
    };

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid("missing host"));
    }

    let port = match port {
        Some(p) => p.parse::<u16>().map_err(|_| invalid("port is not a number"))?,
        None => DEFAULT_REDIS_PORT,
    };

    Ok((host.to_string(), port))
}
