//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml (optional)
//!     → loader.rs (read & deserialize, defaults for missing sections)
//!     → validation.rs (semantic checks, all errors collected)
//!     → GatewayConfig (validated, immutable)
//!     → handed to HttpServer at startup
//! ```
//!
//! The route table is *not* part of this configuration: it lives in its own
//! JSON document owned by [`crate::store::RouteStore`] and changes at runtime.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, parse_config, ConfigError};
pub use schema::{
    AdminConfig, GatewayConfig, ListenerConfig, LogFormat, MatchMode, ObservabilityConfig,
    ReloadMode, RoutesConfig, StatsConfig, TimeoutConfig,
};
