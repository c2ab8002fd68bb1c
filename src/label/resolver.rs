//! Outbound label set assembly.
//!
//! # Responsibilities
//! - Merge labels from four sources in strict precedence
//! - Isolate custom resolver faults from the call
//! - Attach or clear the router-label header on the outbound request
//!
//! # Data Flow
//! ```text
//! local static labels
//!     → expression labels (routing rule keys for the route)
//!     → custom resolvers (ascending order)
//!     → context transitive fragment
//!     = label set (later sources win)
//! ```

use std::collections::HashSet;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::label::expression;
use crate::label::rules::{ExpressionLabelKeyProvider, RouteKey};
use crate::metadata::{MetadataContext, MetadataMap, ServiceIdentity};
use crate::observability::metrics;
use crate::transport::{codec, TransportRequest, ROUTER_LABEL_HEADER};

pub type ResolverError = Box<dyn Error + Send + Sync>;

/// Pluggable label source run before the routing decision.
pub trait RouterLabelResolver: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Lower values run first; later resolvers win on key collision.
    fn order(&self) -> i32 {
        0
    }

    fn resolve(
        &self,
        request: &dyn TransportRequest,
        expression_label_keys: &HashSet<String>,
    ) -> Result<MetadataMap, ResolverError>;
}

pub struct LabelResolver {
    local_labels: Arc<MetadataMap>,
    rules: Arc<dyn ExpressionLabelKeyProvider>,
    resolvers: Vec<Arc<dyn RouterLabelResolver>>,
    identity: ServiceIdentity,
}

impl LabelResolver {
    pub fn new(
        local_labels: Arc<MetadataMap>,
        rules: Arc<dyn ExpressionLabelKeyProvider>,
        identity: ServiceIdentity,
    ) -> Self {
        Self {
            local_labels,
            rules,
            resolvers: Vec::new(),
            identity,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn RouterLabelResolver>) -> Self {
        self.resolvers.push(resolver);
        // stable: equal orders keep registration order
        self.resolvers.sort_by_key(|r| r.order());
        self
    }

    pub fn with_resolvers<I>(self, resolvers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn RouterLabelResolver>>,
    {
        resolvers.into_iter().fold(self, Self::with_resolver)
    }

    pub fn resolver_names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Label set for a call from this service to `target_service`.
    pub fn resolve(
        &self,
        request: &dyn TransportRequest,
        target_service: &str,
        context: &MetadataContext,
    ) -> MetadataMap {
        let mut labels = MetadataMap::clone(&self.local_labels);

        let route = RouteKey::new(
            &self.identity.namespace,
            &self.identity.service,
            target_service,
        );
        let keys = self.rules.expression_label_keys(&route);
        if !keys.is_empty() {
            labels.extend(expression::resolve(request, &keys));
        }

        for resolver in &self.resolvers {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| resolver.resolve(request, &keys)));
            match outcome {
                Ok(Ok(resolved)) => labels.extend(resolved),
                Ok(Err(e)) => {
                    tracing::error!(resolver = resolver.name(), error = %e, "Label resolver failed");
                    metrics::record_resolver_failure(resolver.name());
                }
                Err(_) => {
                    tracing::error!(resolver = resolver.name(), "Label resolver panicked");
                    metrics::record_resolver_failure(resolver.name());
                }
            }
        }

        labels.extend(
            context
                .get_all_transitive_custom_metadata()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        labels
    }

    /// Resolve the label set and write it to `request` as the router-label
    /// header. An empty set removes the header.
    pub fn apply(
        &self,
        request: &mut dyn TransportRequest,
        target_service: &str,
        context: &MetadataContext,
    ) -> MetadataMap {
        let labels = self.resolve(&*request, target_service, context);

        let value = if labels.is_empty() {
            None
        } else {
            codec::encode_header_value(&labels)
        };
        match value {
            Some(value) => {
                request.set_header(ROUTER_LABEL_HEADER, value);
                metrics::record_router_label_header(true);
            }
            None => {
                request.remove_header(&ROUTER_LABEL_HEADER);
                metrics::record_router_label_header(false);
            }
        }

        tracing::debug!(target_service, labels = ?labels, "Resolved router labels");
        labels
    }
}
