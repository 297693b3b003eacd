//! Per-path success/failure counters.
//!
//! # Data Flow
//! ```text
//! proxy handler ──record(path, outcome)──▶ StatsTracker
//!                                             │ in-memory DashMap (atomic counters)
//!                                             │
//!                                             └─ mpsc ─▶ writer task ─▶ StatsStorage (SQLite)
//!
//! GET /metrics   ◀── StatsTracker::all        (in-memory view)
//! GET /dashboard ◀── StatsTracker::persisted  (durable view, via the writer)
//! ```
//!
//! # Design Decisions
//! - The in-memory view is authoritative while the process runs
//! - Durable writes are fire-and-forget: failures are logged, never returned
//!   to the request, and the two views may diverge after such a failure
//! - The writer commits everything queued since its last pass in one
//!   transaction; the queue is bounded and overflow drops the durable write
//! - Only durably committed increments survive a restart

mod storage;
mod tracker;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub use storage::{StatsStorage, WriteOp};
pub use tracker::StatsTracker;

/// How a proxied request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Fail,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Fail => "fail",
        }
    }
}

/// Counters for a single path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStat {
    pub path: String,
    pub success: u64,
    pub fail: u64,
}

/// Stats storage failure.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to open stats database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("failed to prepare stats schema: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("stats query failed: {0}")]
    Query(#[source] rusqlite::Error),

    #[error("stats writer is not running")]
    WriterClosed,
}
