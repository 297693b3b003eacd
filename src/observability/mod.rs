//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handlers produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters and latency histograms)
//!
//! Consumers:
//!     → stdout / log aggregation
//!     → Prometheus scrape on observability.metrics_address (optional)
//! ```
//!
//! The per-path JSON counters served on `/metrics` are a separate concern,
//! owned by [`crate::stats`].

pub mod logging;
pub mod metrics;
