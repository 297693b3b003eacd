//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: admin surface first, proxy as the fallback
//! - Wire up middleware (request ID, tracing)
//! - Start the route watcher in `watch` reload mode
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin;
use crate::config::{GatewayConfig, MatchMode, ReloadMode};
use crate::http::proxy::{build_client, proxy_handler, UpstreamClient};
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::stats::StatsTracker;
use crate::store::{RouteStore, RouteWatcher};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteStore>,
    pub stats: Arc<StatsTracker>,
    pub client: UpstreamClient,
    pub match_mode: MatchMode,
    pub reload: ReloadMode,
    pub upstream_timeout: Option<Duration>,
    pub purge_stats_on_delete: bool,
}

/// Startup failures of the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to configure upstream TLS: {0}")]
    Tls(#[from] rustls::Error),

    #[error("failed to watch route file: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The stats tracker is opened by the caller, which also closes it once
    /// the server has stopped.
    pub fn new(config: GatewayConfig, stats: Arc<StatsTracker>) -> Result<Self, ServerError> {
        let client = build_client(&config.timeouts)?;
        let upstream_secs = config.timeouts.upstream_secs;

        let state = AppState {
            routes: Arc::new(RouteStore::new(&config.routes.file)),
            stats,
            client,
            match_mode: config.routes.match_mode,
            reload: config.routes.reload,
            upstream_timeout: (upstream_secs > 0).then(|| Duration::from_secs(upstream_secs)),
            purge_stats_on_delete: config.admin.purge_stats_on_delete,
        };

        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .merge(admin::setup_admin_router())
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let HttpServer { router, state } = self;
        let addr = listener.local_addr()?;

        let _watcher = match state.reload {
            ReloadMode::Watch => {
                match state.routes.reload().await {
                    Ok(table) => tracing::info!(routes = table.len(), "Route table loaded"),
                    Err(e) => tracing::error!(error = %e, "Failed to load routes; starting empty"),
                }
                Some(RouteWatcher::new(Arc::clone(&state.routes)).run()?)
            }
            ReloadMode::PerRequest => None,
        };

        tracing::info!(
            address = %addr,
            route_file = %state.routes.path().display(),
            match_mode = ?state.match_mode,
            reload = ?state.reload,
            "HTTP server starting"
        );

        let app = router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
