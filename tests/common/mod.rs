//! Shared utilities for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Request,
    http::{header::HOST, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use route_gateway::{GatewayConfig, HttpServer, RouteStore, Shutdown, StatsTracker};

/// A gateway running on an ephemeral port, backed by files in a temp dir.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub routes: Arc<RouteStore>,
    pub stats: Arc<StatsTracker>,
    pub route_file: PathBuf,
    shutdown: Shutdown,
    server: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop the server and flush the stats writer.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.server.await;
        self.stats.close().await;
    }
}

/// Start a gateway with `routes` pre-written to its route file.
pub async fn start_gateway<F>(routes: &[(&str, &str)], configure: F) -> TestGateway
where
    F: FnOnce(&mut GatewayConfig),
{
    let dir = tempfile::tempdir().unwrap();
    let route_file = dir.path().join("targets.json");
    if !routes.is_empty() {
        write_routes(&route_file, routes);
    }

    let mut config = GatewayConfig::default();
    config.routes.file = route_file.to_string_lossy().into_owned();
    config.stats.database = dir.path().join("stats.db").to_string_lossy().into_owned();
    config.timeouts.upstream_secs = 5;
    configure(&mut config);

    let stats = Arc::new(StatsTracker::open(&config.stats.database).unwrap());
    let server = HttpServer::new(config, Arc::clone(&stats)).unwrap();
    let routes = Arc::clone(&server.state().routes);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    TestGateway {
        addr,
        routes,
        stats,
        route_file,
        shutdown,
        server,
        _dir: dir,
    }
}

/// Write a route table file the way an operator would, outside the gateway.
pub fn write_routes(path: &Path, routes: &[(&str, &str)]) {
    let table: serde_json::Map<String, Value> = routes
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    std::fs::write(path, serde_json::to_string_pretty(&table).unwrap()).unwrap();
}

/// Start a backend that echoes the request it received as JSON.
///
/// Any path ending in `/slow` waits three seconds before answering.
pub async fn start_echo_backend() -> SocketAddr {
    async fn echo(request: Request) -> Json<Value> {
        let slow = request.uri().path().ends_with("/slow");
        if slow {
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Json(json!({
            "method": request.method().as_str(),
            "path": request.uri().path(),
            "query": request.uri().query(),
            "host": header(HOST.as_str()),
            "forwarded_for": header("x-forwarded-for"),
        }))
    }

    let app = Router::new()
        .route(
            "/status/teapot",
            get(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") }),
        )
        .fallback(echo);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}
