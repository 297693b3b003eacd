//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (percent-decode)
//!     → matcher.rs (exact key, then longest segment-boundary prefix)
//!     → RouteMatch { key, upstream, remainder } or no match
//!     → table.rs (parse upstream, reject non-http(s))
//!     → router.rs (upstream base + remainder + merged query)
//!     → UpstreamTarget { uri, authority }
//! ```
//!
//! # Design Decisions
//! - The table itself is owned by the route store; routing only borrows snapshots
//! - Deterministic: same table and path always resolve the same way

pub mod matcher;
pub mod router;
pub mod table;

pub use matcher::{resolve, RouteMatch};
pub use router::{decode_path, UpstreamTarget};
pub use table::{parse_upstream, validate_entry, EntryError, RouteTable, RESERVED_PATHS};
