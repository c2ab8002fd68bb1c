//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in priority order (acceptable for typical route counts)
//! - Explicit None rather than silent default

use crate::config::RouteConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher};
use crate::transport::TransportRequest;

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub target_service: String,
    pub priority: u32,
    matcher: AndMatcher,
}

#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn from_config(configs: &[RouteConfig]) -> Self {
        let mut routes: Vec<Route> = configs
            .iter()
            .map(|config| {
                let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
                if let Some(host) = &config.host {
                    matchers.push(Box::new(HostMatcher::new(host.clone())));
                }
                if let Some(prefix) = &config.path_prefix {
                    matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
                }
                Route {
                    name: config.name.clone(),
                    target_service: config.target_service.clone(),
                    priority: config.priority,
                    matcher: AndMatcher::new(matchers),
                }
            })
            .collect();

        // Higher priority first; config order breaks ties.
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { routes }
    }

    /// First route whose conditions all match.
    pub fn match_request(&self, req: &dyn TransportRequest) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(req))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn route(name: &str, host: Option<&str>, prefix: Option<&str>, priority: u32) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            host: host.map(Into::into),
            path_prefix: prefix.map(Into::into),
            target_service: format!("{name}-svc"),
            priority,
        }
    }

    #[test]
    fn test_priority_order() {
        let router = Router::from_config(&[
            route("catch-all", None, Some("/"), 0),
            route("api", None, Some("/api"), 10),
            route("api-host", Some("api.example.com"), Some("/api"), 20),
        ]);
        assert_eq!(router.len(), 3);

        let req = Request::builder()
            .uri("http://example.com/api/users")
            .header("host", "example.com")
            .body(Body::empty())
            .unwrap();
        assert_eq!(router.match_request(&req).unwrap().name, "api");

        let req = Request::builder()
            .uri("http://api.example.com/api/users")
            .header("host", "api.example.com")
            .body(Body::empty())
            .unwrap();
        assert_eq!(router.match_request(&req).unwrap().target_service, "api-host-svc");

        let req = Request::builder()
            .uri("http://example.com/static")
            .body(Body::empty())
            .unwrap();
        assert_eq!(router.match_request(&req).unwrap().name, "catch-all");
    }

    #[test]
    fn test_no_match() {
        let router = Router::from_config(&[route("api", None, Some("/api"), 0)]);
        let req = Request::builder().uri("/other").body(Body::empty()).unwrap();
        assert!(router.match_request(&req).is_none());
    }
}
