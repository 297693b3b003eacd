//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from TOML files, and every
//! section falls back to its defaults so a minimal (or absent) file works.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route file location and routing behaviour.
    pub routes: RoutesConfig,

    /// Durable counter storage.
    pub stats: StatsConfig,

    /// Upstream timeouts.
    pub timeouts: TimeoutConfig,

    /// Logging and Prometheus exporter settings.
    pub observability: ObservabilityConfig,

    /// Admin surface behaviour.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How a request path is resolved against the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Exact key first, then the longest key that prefixes the path on a segment boundary.
    #[default]
    Prefix,
    /// Only exact key equality resolves. This is how the gateway originally
    /// routed; `prefix` adds forwarding of sub-paths.
    Exact,
}

/// Where routing decisions read the route table from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReloadMode {
    /// Load the route file under the store lock on every request.
    #[default]
    PerRequest,
    /// Read an in-memory snapshot kept current by a file watcher.
    Watch,
}

/// Route file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Path to the JSON route document.
    pub file: String,

    /// Path resolution strategy.
    pub match_mode: MatchMode,

    /// Route table refresh strategy.
    pub reload: ReloadMode,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            file: "config/targets.json".to_string(),
            match_mode: MatchMode::default(),
            reload: ReloadMode::default(),
        }
    }
}

/// Stats persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Path to the SQLite database holding the counters.
    pub database: String,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            database: "stats.db".to_string(),
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds (0 = none).
    pub connect_secs: u64,

    /// Deadline for the upstream response head in seconds (0 = none).
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter listen address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "route_gateway=info,tower_http=info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Drop a path's counters when its route is deleted.
    pub purge_stats_on_delete: bool,
}
