//! Path-routing reverse proxy gateway with per-path success/failure counters.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod stats;
pub mod store;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use stats::StatsTracker;
pub use store::RouteStore;
