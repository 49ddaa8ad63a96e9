//! Error types for the health-check service, one enum per concern.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration file discovery and decoding errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No config file exists in any search directory.
    #[error("no config file found (searched: {})", display_paths(.searched))]
    NotFound {
        /// Directories that were searched, in order.
        searched: Vec<PathBuf>,
    },

    /// The file exists but could not be parsed or decoded.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The config file that failed to decode.
        path: PathBuf,
        /// Underlying decoding error.
        #[source]
        source: Box<figment::Error>,
    },
}

/// Liveness check and connection errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The configured address is not `host[:port]`.
    #[error("invalid store address {addr:?}: {reason}")]
    InvalidAddress {
        /// The offending address.
        addr: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Network, protocol or timeout failure from the client.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The handle was closed during shutdown.
    #[error("store handle is closed")]
    Closed,

    /// The store answered, but not with the expected reply.
    #[error("unexpected reply: {0}")]
    Unexpected(String),
}

/// HTTP server lifecycle errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested listen address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    /// Connections were still open when the grace period ran out.
    #[error("shutdown grace period of {}s exceeded, closing remaining connections", .grace.as_secs_f64())]
    ShutdownTimeout {
        /// The grace period that elapsed.
        grace: Duration,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
