//! Health-check service entry point.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cicd_server::api::{create_router, AppState};
use cicd_server::config::{Config, DEFAULT_CONFIG_DIRS};
use cicd_server::metrics;
use cicd_server::server::{Server, DEFAULT_PORT};
use cicd_server::store::{RedisStore, Store};
use cicd_server::utils::cancel_on_signal;

/// Health-check HTTP service backed by a Redis liveness probe.
#[derive(Parser, Debug)]
#[command(name = "cicd-server")]
#[command(about = "Health-check HTTP service backed by a Redis liveness probe")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Directory to search for the config file. Repeatable; replaces the
    /// default search path (`.` then `/etc/conf`).
    #[arg(long = "config-dir", global = true)]
    config_dirs: Vec<PathBuf>,

    /// Address to listen on.
    #[arg(long, global = true, default_value = "0.0.0.0")]
    host: IpAddr,

    /// HTTP server port.
    #[arg(short, long, global = true, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Check configuration validity.
    CheckConfig,

    /// Ping the configured store once.
    CheckStore,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_tracing(args.verbose, args.log_format);

    let dirs = if args.config_dirs.is_empty() {
        DEFAULT_CONFIG_DIRS.iter().map(PathBuf::from).collect()
    } else {
        args.config_dirs.clone()
    };

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => cmd_serve(&dirs, SocketAddr::new(args.host, args.port)).await,
        Command::CheckConfig => cmd_check_config(&dirs),
        Command::CheckStore => cmd_check_store(&dirs).await,
    }
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = if verbose {
        EnvFilter::new("cicd_server=debug,tower_http=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

fn load_config(dirs: &[PathBuf]) -> anyhow::Result<Config> {
    Config::load_from(dirs).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::Error::new(e)
    })
}

/// Run the HTTP server until SIGINT/SIGTERM.
async fn cmd_serve(dirs: &[PathBuf], addr: SocketAddr) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let config = load_config(dirs)?;
    info!(
        redis_addr = %config.redis.addr,
        redis_db = config.redis.db,
        redis_auth = config.redis.has_password(),
        "Configuration loaded"
    );

    // Create store handle (no network work yet)
    let store: Arc<dyn Store> = Arc::new(
        RedisStore::connect(&config.redis).context("failed to create redis client")?,
    );

    // Initialize metrics
    let metrics_handle =
        metrics::install_recorder().context("failed to install metrics recorder")?;

    // Wire routes and bind
    let state = AppState::new(store.clone()).with_metrics(metrics_handle);
    let router = create_router(state);

    let server = Server::new(router, store).bind(addr).map_err(|e| {
        error!("Failed to start HTTP server: {}", e);
        e
    })?;

    let shutdown = CancellationToken::new();
    let _signals = cancel_on_signal(shutdown.clone());

    let report = server.run(shutdown).await?;
    info!(
        forced = report.forced,
        drain_ms = report.drain_time.as_millis() as u64,
        "Shutdown complete"
    );

    Ok(())
}

/// Check configuration validity.
fn cmd_check_config(dirs: &[PathBuf]) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load_from(dirs) {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Parsing store address... ");
    if let Err(e) = RedisStore::connect(&config.redis) {
        println!("FAILED");
        println!("  Error: {}", e);
        return Err(anyhow::anyhow!("Store address invalid"));
    }
    println!("OK");

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Redis Address: {}", config.redis.addr);
    println!("  Redis DB: {}", config.redis.db);
    println!(
        "  Redis Password: {}",
        if config.redis.has_password() { "set" } else { "not set" }
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Ping the configured store once.
async fn cmd_check_store(dirs: &[PathBuf]) -> anyhow::Result<()> {
    let config = load_config(dirs)?;
    let store = RedisStore::connect(&config.redis)?;

    println!("Pinging redis at {}... ", store.addr());
    let timer = metrics::timer_store_ping();
    let result = store.ping().await;
    let elapsed_ms = timer.elapsed_ms();
    drop(timer);
    store.close().await;

    match result {
        Ok(()) => {
            println!("OK ({:.1} ms)", elapsed_ms);
            Ok(())
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            Err(anyhow::anyhow!("Store liveness check failed"))
        }
    }
}
