//! Accessors the codec needs from a transport request.
//!
//! Implemented for `http::Request<B>` (inbound and outbound) and
//! `http::request::Parts`, so every adapter shares one hook surface.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{request::Parts, Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};

use crate::observability::metrics::{self, DecodeStage};

pub trait TransportRequest {
    fn header_map(&self) -> &HeaderMap;
    fn header_map_mut(&mut self) -> &mut HeaderMap;
    fn request_uri(&self) -> &Uri;
    fn request_method(&self) -> &Method;
    fn extensions_ref(&self) -> &Extensions;

    /// Every value of `name` in order. Values that are not visible ASCII
    /// are skipped and counted as decode failures.
    fn header_values(&self, name: &HeaderName) -> Vec<&str> {
        self.header_map()
            .get_all(name)
            .iter()
            .filter_map(|value| match value.to_str() {
                Ok(s) => Some(s),
                Err(_) => {
                    tracing::warn!(header = %name, "Skipping non-ASCII header value");
                    metrics::record_decode_failure(name.as_str(), DecodeStage::Header);
                    None
                }
            })
            .collect()
    }

    fn first_header_value(&self, name: &str) -> Option<&str> {
        self.header_map().get(name).and_then(|v| v.to_str().ok())
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.header_map_mut().insert(name, value);
    }

    fn remove_header(&mut self, name: &HeaderName) {
        self.header_map_mut().remove(name);
    }

    fn request_path(&self) -> &str {
        self.request_uri().path()
    }

    fn query(&self) -> Option<&str> {
        self.request_uri().query()
    }

    /// Peer address recorded by axum's `ConnectInfo`, if any.
    fn caller_ip(&self) -> Option<String> {
        self.extensions_ref()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    }
}

impl<B> TransportRequest for Request<B> {
    fn header_map(&self) -> &HeaderMap {
        self.headers()
    }

    fn header_map_mut(&mut self) -> &mut HeaderMap {
        self.headers_mut()
    }

    fn request_uri(&self) -> &Uri {
        self.uri()
    }

    fn request_method(&self) -> &Method {
        self.method()
    }

    fn extensions_ref(&self) -> &Extensions {
        self.extensions()
    }
}

impl TransportRequest for Parts {
    fn header_map(&self) -> &HeaderMap {
        &self.headers
    }

    fn header_map_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn request_uri(&self) -> &Uri {
        &self.uri
    }

    fn request_method(&self) -> &Method {
        &self.method
    }

    fn extensions_ref(&self) -> &Extensions {
        &self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_values_in_order() {
        let req = Request::builder()
            .uri("http://svc/a/b?x=1")
            .header("x-multi", "one")
            .header("x-multi", "two")
            .body(())
            .unwrap();

        let name = HeaderName::from_static("x-multi");
        assert_eq!(req.header_values(&name), vec!["one", "two"]);
        assert_eq!(req.request_path(), "/a/b");
        assert_eq!(req.query(), Some("x=1"));
        assert_eq!(req.request_method(), Method::GET);
    }

    #[test]
    fn test_non_ascii_values_skipped() {
        let mut req = Request::builder().body(()).unwrap();
        let name = HeaderName::from_static("x-bin");
        req.headers_mut().append(&name, HeaderValue::from_bytes(b"caf\xc3\xa9").unwrap());
        req.headers_mut().append(&name, HeaderValue::from_static("ok"));

        assert_eq!(req.header_values(&name), vec!["ok"]);
    }

    #[test]
    fn test_set_and_remove_on_parts() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let name = HeaderName::from_static("x-set");
        parts.set_header(name.clone(), HeaderValue::from_static("1"));
        parts.set_header(name.clone(), HeaderValue::from_static("2"));
        assert_eq!(parts.header_values(&name), vec!["2"]);

        parts.remove_header(&name);
        assert!(parts.header_values(&name).is_empty());
    }

    #[test]
    fn test_caller_ip_from_connect_info() {
        let mut req = Request::builder().body(()).unwrap();
        assert_eq!(req.caller_ip(), None);

        let addr: SocketAddr = "10.1.2.3:5555".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(req.caller_ip().as_deref(), Some("10.1.2.3"));
    }
}
