//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Init logging → Open stats (fatal on failure) → Bind → Serve
//!
//! Shutdown:
//!     SIGINT/SIGTERM (signals.rs) → Shutdown::trigger (shutdown.rs)
//!     → server stops accepting, drains in-flight requests
//!     → stats writer flushed and closed
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
