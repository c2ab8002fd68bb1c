//! Expression label keys and their evaluation against a request.
//!
//! A routing rule names request attributes with keys such as
//! `$header.x-user` or `$query.uid`. The resolved label uses the expression
//! itself as the label key so the routing rule can match on it verbatim.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::metadata::MetadataMap;
use crate::transport::TransportRequest;

pub const LABEL_HEADER_PREFIX: &str = "$header.";
pub const LABEL_COOKIE_PREFIX: &str = "$cookie.";
pub const LABEL_QUERY_PREFIX: &str = "$query.";
pub const LABEL_METHOD: &str = "$method";
pub const LABEL_PATH: &str = "$path";
pub const LABEL_CALLER_IP: &str = "$caller_ip";

/// Request attribute an expression key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression<'a> {
    Header(&'a str),
    Cookie(&'a str),
    Query(&'a str),
    Method,
    Path,
    CallerIp,
}

impl<'a> Expression<'a> {
    pub fn parse(key: &'a str) -> Option<Self> {
        let named = |prefix: &str| key.strip_prefix(prefix).filter(|name| !name.is_empty());

        if let Some(name) = named(LABEL_HEADER_PREFIX) {
            return Some(Self::Header(name));
        }
        if let Some(name) = named(LABEL_COOKIE_PREFIX) {
            return Some(Self::Cookie(name));
        }
        if let Some(name) = named(LABEL_QUERY_PREFIX) {
            return Some(Self::Query(name));
        }
        match key {
            LABEL_METHOD => Some(Self::Method),
            LABEL_PATH => Some(Self::Path),
            LABEL_CALLER_IP => Some(Self::CallerIp),
            _ => None,
        }
    }

    /// Value of the attribute on `request`, `None` when absent.
    pub fn evaluate(&self, request: &dyn TransportRequest) -> Option<String> {
        match *self {
            Self::Header(name) => request.first_header_value(name).map(lenient_decode),
            Self::Cookie(name) => cookie_value(request, name).map(lenient_decode),
            Self::Query(name) => request.query().and_then(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.into_owned())
            }),
            Self::Method => Some(request.request_method().as_str().to_string()),
            Self::Path => Some(request.request_path().to_string()),
            Self::CallerIp => request.caller_ip(),
        }
    }
}

pub fn is_valid_expression_key(key: &str) -> bool {
    Expression::parse(key).is_some()
}

/// Evaluate every key in `keys` against `request`.
///
/// Unknown expression forms and absent attributes contribute nothing.
pub fn resolve(request: &dyn TransportRequest, keys: &HashSet<String>) -> MetadataMap {
    let mut labels = MetadataMap::new();
    for key in keys {
        let Some(expression) = Expression::parse(key) else {
            tracing::debug!(key = %key, "Ignoring unknown expression label");
            continue;
        };
        if let Some(value) = expression.evaluate(request) {
            labels.insert(key.clone(), value);
        }
    }
    labels
}

fn cookie_value<'r>(request: &'r dyn TransportRequest, name: &str) -> Option<&'r str> {
    request
        .header_map()
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim())
}

/// Percent-decode `raw`, keeping it unchanged when it is not valid UTF-8
/// after decoding.
fn lenient_decode(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}
