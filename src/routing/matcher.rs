//! Path resolution against the route table.
//!
//! # Responsibilities
//! - Find the route key that owns a request path
//! - Split the path into the matched key and the remainder to forward
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - An exact key always wins over a prefix
//! - Prefixes only match on segment boundaries: `/api` owns `/api/users`
//!   but not `/apiary`
//! - Longest matching prefix wins; the table is small, so a linear scan is fine

use crate::config::MatchMode;
use crate::routing::table::RouteTable;

/// A resolved route borrowed from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// The route key that matched. Counters are recorded under this key.
    pub key: &'a str,
    /// Upstream string as stored in the table (not yet parsed).
    pub upstream: &'a str,
    /// What is left of the request path once the key is stripped.
    pub remainder: &'a str,
}

/// Resolve `path` against `table`.
pub fn resolve<'a>(table: &'a RouteTable, path: &'a str, mode: MatchMode) -> Option<RouteMatch<'a>> {
    if let Some(upstream) = table.get(path) {
        return Some(RouteMatch {
            key: path,
            upstream,
            remainder: "",
        });
    }

    if mode == MatchMode::Exact {
        return None;
    }

    table
        .iter()
        .filter(|(key, _)| owns(key, path))
        .max_by_key(|(key, _)| key.len())
        .map(|(key, upstream)| RouteMatch {
            key,
            upstream,
            remainder: &path[key.len()..],
        })
}

fn owns(key: &str, path: &str) -> bool {
    match path.strip_prefix(key) {
        Some(rest) => rest.is_empty() || key.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        [
            ("/api", "https://example.com"),
            ("/api/v2", "http://v2.internal:8080"),
            ("/static/", "http://cdn.internal"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_exact_hit() {
        let table = table();
        let m = resolve(&table, "/api", MatchMode::Prefix).unwrap();
        assert_eq!(m.key, "/api");
        assert_eq!(m.upstream, "https://example.com");
        assert_eq!(m.remainder, "");
    }

    #[test]
    fn test_prefix_strips_key() {
        let table = table();
        let m = resolve(&table, "/api/v1/users", MatchMode::Prefix).unwrap();
        assert_eq!(m.key, "/api");
        assert_eq!(m.remainder, "/v1/users");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = table();
        let m = resolve(&table, "/api/v2/orders", MatchMode::Prefix).unwrap();
        assert_eq!(m.key, "/api/v2");
        assert_eq!(m.remainder, "/orders");
    }

    #[test]
    fn test_segment_boundary() {
        let table = table();
        assert!(resolve(&table, "/apiary", MatchMode::Prefix).is_none());

        let m = resolve(&table, "/static/app.js", MatchMode::Prefix).unwrap();
        assert_eq!(m.key, "/static/");
        assert_eq!(m.remainder, "app.js");
    }

    #[test]
    fn test_exact_mode_ignores_prefixes() {
        let table = table();
        assert!(resolve(&table, "/api/v1/users", MatchMode::Exact).is_none());
        assert!(resolve(&table, "/api", MatchMode::Exact).is_some());
    }

    #[test]
    fn test_exact_lookup_by_key() {
        let table: RouteTable = [("/café", "http://cafe.local"), ("/caf", "http://caf.local")]
            .into_iter()
            .collect();
        for mode in [MatchMode::Prefix, MatchMode::Exact] {
            let m = resolve(&table, "/café", mode).unwrap();
            assert_eq!(m.key, "/café");
            assert_eq!(m.upstream, "http://cafe.local");
            assert_eq!(m.remainder, "");
        }
    }

    #[test]
    fn test_empty_table_misses() {
        let table = RouteTable::new();
        assert!(resolve(&table, "/anything", MatchMode::Prefix).is_none());
        assert!(resolve(&table, "/", MatchMode::Prefix).is_none());
    }
}
