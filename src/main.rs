use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hashgate::clock::{Clock, SystemClock};
use hashgate::config::{HashgateConfig, LogFormat, LoggingConfig, StoreBackend};
use hashgate::http::HttpServer;
use hashgate::privacy::KeyHasher;
use hashgate::ratelimit::{RateLimiter, WindowCounter};
use hashgate::store;

#[derive(Debug, Parser)]
#[command(name = "hashgate", version, about = "Privacy-preserving shared rate limiting service")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "HASHGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Address for the HTTP API, overriding the configuration
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Counting store backend, overriding the configuration
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,

    /// Log format, overriding the configuration
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = HashgateConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    if let Some(backend) = args.store {
        config.store.backend = backend;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    init_tracing(&config.logging);

    info!("Starting Hashgate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        http_addr = %config.server.http_addr,
        backend = ?config.store.backend,
        timeout_ms = config.store.timeout_ms,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let counting_store = store::connect(&config.store, clock.clone()).await?;

    let counter = WindowCounter::new(counting_store, clock)
        .with_timeout(config.store.timeout())
        .with_key_prefix(config.store.key_prefix.clone());
    let rate_limiter = Arc::new(RateLimiter::new(counter, KeyHasher::new(config.salt()?)));
    info!("Rate limiter initialized");

    let server = HttpServer::new(
        config.server.http_addr,
        rate_limiter,
        config.server.body_limit_bytes,
    );
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Hashgate Rate Limiting Service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter.as_str()));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
