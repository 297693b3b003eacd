//! Route storage.
//!
//! # Data Flow
//! ```text
//! admin POST/DELETE ──▶ RouteStore::modify ──┐
//!                                            ├─▶ targets.json (temp file + rename)
//! proxy (per_request) ─▶ RouteStore::load ───┘
//!
//! proxy (watch) ──▶ RouteStore::snapshot ◀── RouteWatcher (notify) ◀── file edits
//! ```
//!
//! # Design Decisions
//! - One coarse lock for the whole document; route edits are rare
//! - The lock is never held across an upstream call
//! - Saves publish their table as the new snapshot, so `watch` mode still
//!   reads its own writes without waiting for the file event

mod route_store;
mod watcher;

pub use route_store::{RouteStore, StoreError};
pub use watcher::RouteWatcher;
