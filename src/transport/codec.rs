//! Header codec for metadata fragments.
//!
//! Wire format: a flat JSON object of strings, then form-style
//! percent-encoding (space as `+`). Decoding never fails: absent input is
//! an empty map, broken input is logged, counted and treated as empty.
//! A value starting with `{` is the raw serialized fallback and is parsed
//! as-is, without `+` or percent decoding.

use std::borrow::Cow;

use axum::http::{HeaderName, HeaderValue};
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::metadata::MetadataMap;
use crate::observability::metrics::{self, DecodeStage};

/// Transitive metadata, forwarded on every hop.
pub const CUSTOM_METADATA: HeaderName = HeaderName::from_static("sct-custom-metadata");

/// Disposable metadata, read by the next hop only.
pub const CUSTOM_DISPOSABLE_METADATA: HeaderName =
    HeaderName::from_static("sct-custom-disposable-metadata");

/// Merged outbound label set for the routing decision.
pub const ROUTER_LABEL_HEADER: HeaderName = HeaderName::from_static("internal-router-label");

/// Serialize a map to its JSON form.
pub fn serialize(map: &MetadataMap) -> String {
    serde_json::to_string(map).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize metadata");
        "{}".to_string()
    })
}

/// Serialized and percent-encoded payload.
pub fn encode(map: &MetadataMap) -> String {
    form_urlencoded::byte_serialize(serialize(map).as_bytes()).collect()
}

/// Header value for `map`, falling back to the raw serialized form when
/// the encoded form is not a valid header value. `None` only when neither is.
pub fn encode_header_value(map: &MetadataMap) -> Option<HeaderValue> {
    let serialized = serialize(map);
    let encoded: String = form_urlencoded::byte_serialize(serialized.as_bytes()).collect();
    match HeaderValue::from_str(&encoded) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "Percent-encoded metadata rejected, sending raw");
            match HeaderValue::from_str(&serialized) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!(error = %e, "Raw metadata rejected, header dropped");
                    None
                }
            }
        }
    }
}

/// Decode one header value of `header`.
pub fn decode(header: &HeaderName, value: &str) -> MetadataMap {
    let value = value.trim();
    if value.is_empty() {
        return MetadataMap::new();
    }

    let decoded: Cow<'_, str> = if value.starts_with('{') {
        Cow::Borrowed(value)
    } else {
        let plus_as_space = value.replace('+', " ");
        match percent_decode_str(&plus_as_space).decode_utf8() {
            Ok(decoded) => Cow::Owned(decoded.into_owned()),
            Err(e) => {
                tracing::warn!(header = %header, error = %e, "Metadata header is not valid percent-encoded UTF-8");
                metrics::record_decode_failure(header.as_str(), DecodeStage::Percent);
                return MetadataMap::new();
            }
        }
    };

    match serde_json::from_str::<MetadataMap>(&decoded) {
        Ok(map) => {
            tracing::debug!(header = %header, metadata = ?map, "Decoded upstream metadata");
            map
        }
        Err(e) => {
            tracing::warn!(header = %header, error = %e, "Malformed metadata payload dropped");
            metrics::record_decode_failure(header.as_str(), DecodeStage::Json);
            MetadataMap::new()
        }
    }
}

/// Decode every occurrence of `header` in order; later occurrences win.
pub fn decode_all<'a, I>(header: &HeaderName, values: I) -> MetadataMap
where
    I: IntoIterator<Item = &'a str>,
{
    let mut merged = MetadataMap::new();
    for value in values {
        merged.extend(decode(header, value));
    }
    merged
}
