//! Metadata ingress: decode upstream headers into the request scope.
//!
//! # Responsibilities
//! - Decode every occurrence of the metadata headers
//! - Open a request scope and initialize its context
//! - Record the local identity and path in the System fragment
//! - Expose the context through request extensions
//!
//! # Design Decisions
//! - The task-local scope owns the context; an aborted request drops it
//!   with the future, so teardown does not depend on the success path

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::metadata::context::{LOCAL_NAMESPACE, LOCAL_PATH, LOCAL_SERVICE};
use crate::metadata::{MetadataContext, MetadataContextHolder, MetadataMap, ServiceIdentity};
use crate::transport::{codec, TransportRequest, CUSTOM_DISPOSABLE_METADATA, CUSTOM_METADATA};

#[derive(Debug, Clone)]
pub struct IngressState {
    pub holder: MetadataContextHolder,
    pub identity: ServiceIdentity,
}

/// Decoded (transitive, disposable) metadata of an inbound request.
pub fn decode_inbound(request: &dyn TransportRequest) -> (MetadataMap, MetadataMap) {
    let transitive = codec::decode_all(&CUSTOM_METADATA, request.header_values(&CUSTOM_METADATA));
    let disposable = codec::decode_all(
        &CUSTOM_DISPOSABLE_METADATA,
        request.header_values(&CUSTOM_DISPOSABLE_METADATA),
    );
    (transitive, disposable)
}

/// Initialize the current scope's context from `request`.
///
/// Must run inside a scope opened by [`MetadataContextHolder::scope`] or
/// [`MetadataContextHolder::sync_scope`].
pub fn init_context(
    holder: &MetadataContextHolder,
    identity: &ServiceIdentity,
    request: &dyn TransportRequest,
) -> Arc<MetadataContext> {
    let (transitive, disposable) = decode_inbound(request);
    let context = holder.init(transitive, disposable);
    context.put_system_metadata(LOCAL_NAMESPACE, identity.namespace.as_str());
    context.put_system_metadata(LOCAL_SERVICE, identity.service.as_str());
    context.put_system_metadata(LOCAL_PATH, request.request_path());
    context
}

/// Axum middleware wrapping the rest of the chain in a metadata scope.
pub async fn metadata_ingress(
    State(state): State<IngressState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    MetadataContextHolder::scope(None, async move {
        let context = init_context(&state.holder, &state.identity, &request);
        tracing::debug!(
            path = %request.uri().path(),
            transitive = ?context.get_all_transitive_custom_metadata(),
            "Metadata context initialized"
        );
        request.extensions_mut().insert(context);

        let response = next.run(request).await;
        MetadataContextHolder::remove();
        response
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetadataConfig;
    use crate::metadata::{Fragment, StaticMetadataManager};

    fn holder() -> MetadataContextHolder {
        let config = MetadataConfig {
            content: [("stage".to_string(), "static".to_string())].into(),
            transitive: vec!["stage".into()],
            disposable: vec![],
        };
        let statics = StaticMetadataManager::from_sources(&config, Vec::<(String, String)>::new());
        MetadataContextHolder::new(Arc::new(statics))
    }

    fn encoded(entries: &[(&str, &str)]) -> String {
        let map: MetadataMap = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        codec::encode(&map)
    }

    #[tokio::test]
    async fn test_init_context_from_headers() {
        let request = Request::builder()
            .uri("http://svc/orders")
            .header(CUSTOM_METADATA, encoded(&[("stage", "upstream"), ("a", "1")]))
            .header(CUSTOM_METADATA, encoded(&[("a", "2")]))
            .header(CUSTOM_DISPOSABLE_METADATA, encoded(&[("once", "x")]))
            .body(Body::empty())
            .unwrap();
        let identity = ServiceIdentity {
            namespace: "prod".into(),
            service: "callee".into(),
        };
        let holder = holder();

        MetadataContextHolder::scope(None, async {
            let context = init_context(&holder, &identity, &request);

            assert_eq!(context.get_transitive_custom_metadata("stage").as_deref(), Some("upstream"));
            assert_eq!(context.get_transitive_custom_metadata("a").as_deref(), Some("2"));
            assert_eq!(
                context.get_upstream_disposable_metadata().get("once").map(String::as_str),
                Some("x")
            );
            assert!(context.get_disposable_metadata().is_empty());
            assert_eq!(
                context.get_fragment_value(Fragment::System, LOCAL_PATH).as_deref(),
                Some("/orders")
            );
            assert!(Arc::ptr_eq(&context, &holder.get()));
        })
        .await;

        assert!(MetadataContextHolder::current().is_none());
    }

    #[test]
    fn test_decode_inbound_without_headers() {
        let request = Request::builder().body(()).unwrap();
        let (transitive, disposable) = decode_inbound(&request);
        assert!(transitive.is_empty());
        assert!(disposable.is_empty());
    }
}
