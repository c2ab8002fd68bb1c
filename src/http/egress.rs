//! Metadata egress: write the context onto an outbound request.
//!
//! # Data Flow
//! ```text
//! outbound request (headers copied from inbound)
//!     → merge custom-metadata already on the request into the context
//!     → replace custom-metadata with the Transitive fragment
//!     → replace disposable header with the Disposable fragment
//!     → LabelResolver sets or clears the router-label header
//! ```
//!
//! # Design Decisions
//! - Headers are replaced, never appended, so a copied inbound header
//!   cannot survive next to the fresh one
//! - UpstreamDisposable is never written; disposable metadata stops here

use crate::label::LabelResolver;
use crate::metadata::{MetadataContext, MetadataMap};
use crate::transport::{
    codec, TransportRequest, CUSTOM_DISPOSABLE_METADATA, CUSTOM_METADATA,
};
use axum::http::HeaderName;

/// Write the transitive and disposable fragments of `context` to `request`.
pub fn encode_transfer_metadata(request: &mut dyn TransportRequest, context: &MetadataContext) {
    let existing = codec::decode_all(&CUSTOM_METADATA, request.header_values(&CUSTOM_METADATA));
    for (key, value) in existing {
        context.put_transitive_custom_metadata(key, value);
    }

    replace_header(
        request,
        CUSTOM_METADATA,
        &context.get_all_transitive_custom_metadata(),
    );
    replace_header(
        request,
        CUSTOM_DISPOSABLE_METADATA,
        &context.get_disposable_metadata(),
    );
}

/// Full egress: transfer metadata, then attach the router labels for a
/// call to `target_service`. Returns the label set.
pub fn prepare_outbound(
    request: &mut dyn TransportRequest,
    context: &MetadataContext,
    labels: &LabelResolver,
    target_service: &str,
) -> MetadataMap {
    encode_transfer_metadata(request, context);
    labels.apply(request, target_service, context)
}

fn replace_header(request: &mut dyn TransportRequest, name: HeaderName, map: &MetadataMap) {
    let value = if map.is_empty() {
        None
    } else {
        codec::encode_header_value(map)
    };
    match value {
        Some(value) => request.set_header(name, value),
        None => request.remove_header(&name),
    }
}
