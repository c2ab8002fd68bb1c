//! Route matching logic.
//!
//! # Responsibilities
//! - Match host header (exact match, case-insensitive, port ignored)
//! - Match path prefix (case-sensitive)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Matchers read the request through `TransportRequest`
//! - Empty condition = always matches (wildcard)
//! - No regex to guarantee O(n) matching

use axum::http::header::HOST;

use crate::transport::TransportRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &dyn TransportRequest) -> bool;
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &dyn TransportRequest) -> bool {
        let host = req
            .first_header_value(HOST.as_str())
            .or_else(|| req.request_uri().host());
        host.map(|h| {
            let name = h.rsplit_once(':').map_or(h, |(name, _)| name);
            name.eq_ignore_ascii_case(&self.expected_host)
        })
        .unwrap_or(false)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &dyn TransportRequest) -> bool {
        req.request_path().starts_with(&self.prefix)
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &dyn TransportRequest) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");

        let req1 = Request::builder()
            .header("Host", "example.com")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req1));

        let req2 = Request::builder()
            .header("Host", "EXAMPLE.COM:8080")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req2));

        let req3 = Request::builder()
            .header("Host", "other.com")
            .body(Body::default())
            .unwrap();
        assert!(!matcher.matches(&req3));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        let req1 = Request::builder()
            .uri("http://example.com/api/v1")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req1));

        let req2 = Request::builder()
            .uri("http://example.com/images")
            .body(Body::default())
            .unwrap();
        assert!(!matcher.matches(&req2));
    }

    #[test]
    fn test_and_matcher() {
        let matcher = AndMatcher::new(vec![
            Box::new(HostMatcher::new("example.com")),
            Box::new(PathPrefixMatcher::new("/api")),
        ]);

        let req = Request::builder()
            .uri("http://example.com/api")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req));

        let req = Request::builder()
            .uri("http://example.com/web")
            .body(Body::default())
            .unwrap();
        assert!(!matcher.matches(&req));
    }
}
