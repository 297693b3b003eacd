//! The route table and its entry rules.
//!
//! # Responsibilities
//! - Hold the path prefix → upstream mapping as it appears on disk
//! - Validate entries submitted through the admin surface
//!
//! # Design Decisions
//! - Serialized as a bare JSON object (`{"/api": "https://..."}`)
//! - BTreeMap keeps the file diff-friendly: keys are always written sorted
//! - Entries read from disk are not re-validated; the router rejects bad
//!   upstreams per request so one hand-edited line cannot take the table down

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Paths owned by the gateway itself.
pub const RESERVED_PATHS: [&str; 4] = ["/", "/dashboard", "/metrics", "/targets"];

/// Mapping from path prefix to upstream URL string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable(BTreeMap<String, String>);

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upstream configured for an exact key.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Insert or overwrite an entry, returning the previous upstream.
    pub fn insert(&mut self, path: impl Into<String>, upstream: impl Into<String>) -> Option<String> {
        self.0.insert(path.into(), upstream.into())
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.0.remove(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(path, upstream)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Why a submitted route entry was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("Path must start with '/'")]
    InvalidPath,

    #[error("Invalid target URL")]
    InvalidTarget,

    #[error("This path is reserved and cannot be overridden")]
    Reserved,
}

pub fn is_reserved(path: &str) -> bool {
    RESERVED_PATHS.contains(&path)
}

/// Parse an upstream string, accepting only absolute http(s) URLs with a host.
pub fn parse_upstream(target: &str) -> Option<Url> {
    let url = Url::parse(target).ok()?;
    let web_scheme = matches!(url.scheme(), "http" | "https");
    (web_scheme && url.host_str().is_some()).then_some(url)
}

/// Validate a new entry. Checks run in the order the admin surface reports them:
/// path shape, upstream URL, reserved paths.
pub fn validate_entry(path: &str, target: &str) -> Result<Url, EntryError> {
    if !path.starts_with('/') {
        return Err(EntryError::InvalidPath);
    }
    let url = parse_upstream(target).ok_or(EntryError::InvalidTarget)?;
    if is_reserved(path) {
        return Err(EntryError::Reserved);
    }
    Ok(url)
}
