//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gateway handler
//! - Wire up middleware (request ID, tracing, metadata ingress)
//! - Dispatch requests to the routing engine
//! - Run metadata egress and the decision engine for every outbound call
//! - Forward requests to the chosen instance
//! - Observability (metrics, correlation IDs)

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::engine::reporter::{build_call_result, CallOutcome};
use crate::engine::{DecisionEngine, PassthroughEngine, QuotaResult};
use crate::http::egress::prepare_outbound;
use crate::http::ingress::{metadata_ingress, IngressState};
use crate::http::request::{propagate_request_id_layer, request_id_of, set_request_id_layer};
use crate::label::{LabelResolver, RouterLabelResolver, RuleLabelKeyRegistry};
use crate::load_balancer::pool::InstancePool;
use crate::metadata::{MetadataContext, MetadataContextHolder, ServiceIdentity, StaticMetadataManager};
use crate::observability::metrics;
use crate::routing::Router as GatewayRouter;
use crate::transport::ROUTER_LABEL_HEADER;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<GatewayRouter>,
    pub pool: Arc<InstancePool>,
    pub client: Client<HttpConnector, Body>,
    pub holder: MetadataContextHolder,
    pub labels: Arc<LabelResolver>,
    pub engine: Arc<dyn DecisionEngine>,
    pub identity: ServiceIdentity,
    pub request_timeout: Duration,
}

/// HTTP server for the metadata gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    holder: MetadataContextHolder,
}

impl HttpServer {
    /// Server with static metadata from `config` and the process
    /// environment, the passthrough engine and no custom resolvers.
    pub fn new(config: GatewayConfig) -> Self {
        let statics = Arc::new(StaticMetadataManager::new(&config.metadata));
        Self::with_components(config, statics, Arc::new(PassthroughEngine), Vec::new())
    }

    pub fn with_components(
        config: GatewayConfig,
        statics: Arc<StaticMetadataManager>,
        engine: Arc<dyn DecisionEngine>,
        resolvers: Vec<Arc<dyn RouterLabelResolver>>,
    ) -> Self {
        let holder = MetadataContextHolder::new(statics.clone());
        let rules = Arc::new(RuleLabelKeyRegistry::from_config(&config.router.rules));
        let labels = LabelResolver::new(
            statics.merged_metadata().clone(),
            rules,
            config.service.clone(),
        )
        .with_resolvers(resolvers);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            router: Arc::new(GatewayRouter::from_config(&config.routes)),
            pool: Arc::new(InstancePool::new(&config.services)),
            client,
            holder: holder.clone(),
            labels: Arc::new(labels),
            engine,
            identity: config.service.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };
        let ingress = IngressState {
            holder: holder.clone(),
            identity: config.service.clone(),
        };

        let router = Self::build_router(state, ingress);
        Self {
            router,
            config,
            holder,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, ingress: IngressState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(ingress, metadata_ingress))
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.service,
            routes = self.config.routes.len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn holder(&self) -> &MetadataContextHolder {
        &self.holder
    }
}

/// Main gateway handler.
/// Looks up route, runs metadata egress, selects an instance and forwards.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id_of(&request);
    let method_str = request.method().to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method_str,
        path = %path,
        "Proxying request"
    );

    // 1. Match Route
    let target = match state.router.match_request(&request) {
        Some(route) => route.target_service.clone(),
        None => {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            metrics::record_request(&method_str, 404, "none", start_time);
            return (StatusCode::NOT_FOUND, "No matching route found").into_response();
        }
    };

    let context = request
        .extensions()
        .get::<Arc<MetadataContext>>()
        .cloned()
        .unwrap_or_else(|| state.holder.get());

    // 2. Outbound request with copied headers, then egress
    let (parts, body) = request.into_parts();
    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method.clone();
    *outbound.uri_mut() = parts.uri.clone();
    *outbound.headers_mut() = parts.headers.clone();
    if let Some(peer) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        outbound.extensions_mut().insert(peer.clone());
    }

    let labels = prepare_outbound(&mut outbound, &context, &state.labels, &target);

    // 3. Quota
    if let QuotaResult::Deny { reason } = state.engine.get_quota(&target, &labels) {
        tracing::info!(request_id = %request_id, service = %target, reason = %reason, "Quota denied");
        metrics::record_request(&method_str, 429, &target, start_time);
        return (StatusCode::TOO_MANY_REQUESTS, reason).into_response();
    }

    // 4. Select Instance
    let candidates = state
        .engine
        .resolve_route(state.pool.candidates(&target), &labels);
    let instance = match state.pool.choose(&target, &candidates) {
        Some(instance) => instance,
        None => {
            tracing::warn!(request_id = %request_id, service = %target, "No available instances");
            metrics::record_request(&method_str, 503, &target, start_time);
            return (StatusCode::SERVICE_UNAVAILABLE, "No available instances").into_response();
        }
    };
    context.set_load_balancer_instance(&instance.service, &instance.host, instance.port);

    // 5. URI rewrite
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    if let Ok(authority) = Authority::from_str(&instance.authority()) {
        uri_parts.authority = Some(authority);
    }
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    *outbound.uri_mut() = Uri::from_parts(uri_parts).unwrap_or_else(|_| parts.uri.clone());

    let view = report_view(&outbound);
    let upstream = instance.authority();

    // 6. Forward
    let call_start = Instant::now();
    let forwarded = tokio::time::timeout(state.request_timeout, state.client.request(outbound)).await;
    let (outcome, response) = match forwarded {
        Ok(Ok(response)) => {
            let (parts, body) = response.into_parts();
            (
                CallOutcome::Response(parts.status),
                Response::from_parts(parts, Body::new(body)),
            )
        }
        Ok(Err(e)) => {
            tracing::error!(request_id = %request_id, upstream = %upstream, error = %e, "Upstream error");
            (
                CallOutcome::Error,
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response(),
            )
        }
        Err(_) => {
            tracing::error!(request_id = %request_id, upstream = %upstream, "Upstream timed out");
            (
                CallOutcome::Timeout,
                (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response(),
            )
        }
    };

    // 7. Report
    state.engine.report_call_result(build_call_result(
        &view,
        &context,
        &state.identity,
        outcome,
        call_start.elapsed(),
    ));
    metrics::record_request(&method_str, response.status().as_u16(), &upstream, start_time);

    response
}

/// Bodiless copy of what call reporting reads from the outbound request.
fn report_view(outbound: &Request<Body>) -> Request<()> {
    let mut view = Request::new(());
    *view.uri_mut() = outbound.uri().clone();
    for value in outbound.headers().get_all(ROUTER_LABEL_HEADER) {
        view.headers_mut().append(ROUTER_LABEL_HEADER, value.clone());
    }
    view
}
