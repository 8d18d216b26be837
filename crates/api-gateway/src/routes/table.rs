//! Upstream route table.
//!
//! An ordered list of `pattern -> upstream` entries using the same pattern
//! language as the exemption rules. The first matching entry wins.

use crate::auth::exemption::{is_normalized, PathPattern, PatternError};
use reqwest::Url;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route entry '{0}' must have the form pattern=upstream")]
    MissingSeparator(String),

    #[error("route pattern is invalid: {0}")]
    Pattern(#[from] PatternError),

    #[error("route upstream '{0}' must be an absolute http(s) URL")]
    InvalidUpstream(String),
}

/// A single `pattern -> upstream` entry.
#[derive(Clone)]
pub struct RouteEntry {
    pattern: PathPattern,
    upstream: Url,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.pattern, self.upstream)
    }
}

impl RouteEntry {
    pub fn new(pattern: &str, upstream: &str) -> Result<Self, RouteError> {
        let pattern = PathPattern::parse(pattern)?;
        let upstream_text = upstream.trim();
        let upstream = Url::parse(upstream_text)
            .map_err(|_| RouteError::InvalidUpstream(upstream_text.to_string()))?;

        if !matches!(upstream.scheme(), "http" | "https") || upstream.host_str().is_none() {
            return Err(RouteError::InvalidUpstream(upstream_text.to_string()));
        }

        Ok(Self { pattern, upstream })
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Build the upstream URL for an incoming path and optional query.
    ///
    /// The incoming path is appended to the upstream's own path unchanged.
    /// Returns `None` for a path that is not normalized, since URL parsing
    /// would resolve its dot segments into a different path.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Option<Url> {
        if !is_normalized(path) {
            return None;
        }
        let base = self.upstream.as_str().trim_end_matches('/');
        let target = match query {
            Some(q) => format!("{base}{path}?{q}"),
            None => format!("{base}{path}"),
        };
        Url::parse(&target).ok()
    }
}

/// Ordered route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    /// Parse a comma-separated `pattern=upstream` list, preserving order.
    ///
    /// Blank items are skipped.
    pub fn parse(spec: &str) -> Result<Self, RouteError> {
        let entries = spec
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                let (pattern, upstream) = item
                    .split_once('=')
                    .ok_or_else(|| RouteError::MissingSeparator(item.to_string()))?;
                RouteEntry::new(pattern, upstream)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    /// First entry whose pattern matches `path`.
    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.pattern.matches(path))
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::parse(
            "/auth/**=http://localhost:8081, /api/account/**=http://localhost:8082/",
        )
        .unwrap()
    }

    #[test]
    fn test_parse_preserves_order() {
        let table = table();
        let patterns: Vec<_> = table
            .entries()
            .iter()
            .map(|e| e.pattern().as_str().to_string())
            .collect();
        assert_eq!(patterns, vec!["/auth/**", "/api/account/**"]);
    }

    #[test]
    fn test_resolve_matches_prefix_routes() {
        let table = table();

        let entry = table.resolve("/auth/login").unwrap();
        assert_eq!(entry.upstream().as_str(), "http://localhost:8081/");

        let entry = table.resolve("/api/account/member/register").unwrap();
        assert_eq!(entry.upstream().port(), Some(8082));

        assert!(table.resolve("/api/other").is_none());
        assert!(table.resolve("/").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let table =
            RouteTable::parse("/api/**=http://first:1,/api/account/**=http://second:2").unwrap();
        let entry = table.resolve("/api/account/x").unwrap();
        assert_eq!(entry.upstream().host_str(), Some("first"));
    }

    #[test]
    fn test_target_url_keeps_path_and_query() {
        let table = table();
        let entry = table.resolve("/api/account/members").unwrap();

        let url = entry
            .target_url("/api/account/members", Some("page=2&size=10"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8082/api/account/members?page=2&size=10"
        );

        let url = entry.target_url("/api/account/members", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8082/api/account/members");
    }

    #[test]
    fn test_target_url_appends_to_upstream_path() {
        let entry = RouteEntry::new("/svc/**", "http://backend:9000/base/").unwrap();
        let url = entry.target_url("/svc/a", None).unwrap();
        assert_eq!(url.as_str(), "http://backend:9000/base/svc/a");
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert_eq!(
            RouteTable::parse("/auth/**").unwrap_err(),
            RouteError::MissingSeparator("/auth/**".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_pattern() {
        assert!(matches!(
            RouteTable::parse("auth/**=http://localhost:8081"),
            Err(RouteError::Pattern(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_upstream() {
        for upstream in ["localhost:8081", "ftp://host/", "lb://auth-service", "not a url"] {
            assert!(
                matches!(
                    RouteTable::parse(&format!("/auth/**={upstream}")),
                    Err(RouteError::InvalidUpstream(_))
                ),
                "{upstream} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_spec_is_empty_table() {
        assert!(RouteTable::parse("").unwrap().is_empty());
        assert!(RouteTable::parse(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_target_url_refuses_dot_segments() {
        let table = RouteTable::parse("/**=http://localhost:8082").unwrap();
        let entry = table.resolve("/public/../api/account").unwrap();

        assert!(entry.target_url("/public/../api/account", None).is_none());
        assert!(entry
            .target_url("/public/%2e%2e/api/account", None)
            .is_none());
        assert!(entry.target_url("/public/./docs", Some("a=1")).is_none());
    }
}
