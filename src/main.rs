//! Route gateway
//!
//! A path-routing reverse proxy that forwards requests to upstreams listed in
//! a JSON route table and counts success/failure per route.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ axum router ──┬─▶ admin (/targets, /metrics, /dashboard)
//!                              │        │
//!                              │        ▼
//!                              │   RouteStore (targets.json) ◀── watcher
//!                              │        ▲
//!                              └─▶ proxy fallback ──▶ hyper client ──▶ Upstream
//!                                       │
//!                                       ▼
//!                                  StatsTracker ──▶ SQLite writer
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use route_gateway::config::load_or_default;
use route_gateway::observability::{logging, metrics};
use route_gateway::{HttpServer, Shutdown, StatsTracker};

#[derive(Parser)]
#[command(name = "route-gateway")]
#[command(about = "Path-routing reverse proxy with per-route stats", long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_or_default(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_tracing(&config.observability);

    tracing::info!("route-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        route_file = %config.routes.file,
        stats_database = %config.stats.database,
        match_mode = ?config.routes.match_mode,
        reload = ?config.routes.reload,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let stats = match StatsTracker::open(&config.stats.database) {
        Ok(stats) => Arc::new(stats),
        Err(e) => {
            tracing::error!(error = %e, "Failed to open stats database");
            return Err(e.into());
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config, Arc::clone(&stats))?;
    let result = server.run(listener, shutdown.subscribe()).await;

    stats.close().await;

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}
