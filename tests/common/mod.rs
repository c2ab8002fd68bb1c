//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::TcpListener;

use mesh_metadata::config::{
    GatewayConfig, LabelRuleConfig, MetadataConfig, RouteConfig, ServiceConfig,
};
use mesh_metadata::engine::{DecisionEngine, PassthroughEngine};
use mesh_metadata::label::RouterLabelResolver;
use mesh_metadata::metadata::ServiceIdentity;
use mesh_metadata::transport::{codec, CUSTOM_DISPOSABLE_METADATA, CUSTOM_METADATA, ROUTER_LABEL_HEADER};
use mesh_metadata::{HttpServer, MetadataMap, Shutdown, StaticMetadataManager};

/// Start a backend that answers every request with a JSON object holding
/// the path and the raw metadata headers it received (`null` when absent).
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let service = service_fn(|req: Request<Incoming>| async move {
                    let header = |name: &str| {
                        req.headers()
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    let body = serde_json::json!({
                        "path": req.uri().path(),
                        "custom": header(CUSTOM_METADATA.as_str()),
                        "disposable": header(CUSTOM_DISPOSABLE_METADATA.as_str()),
                        "labels": header(ROUTER_LABEL_HEADER.as_str()),
                        "request_id": header("x-request-id"),
                    });
                    Ok::<_, Infallible>(Response::new(body.to_string()))
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

/// Decode one echoed header field; `None` when the backend saw no header.
pub fn echoed(body: &Value, field: &str) -> Option<MetadataMap> {
    body[field]
        .as_str()
        .map(|raw| codec::decode(&CUSTOM_METADATA, raw))
}

pub fn map(entries: &[(&str, &str)]) -> MetadataMap {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Config routing every path to `callee` at `instances`.
pub fn gateway_config(service: &str, instances: Vec<SocketAddr>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.service = ServiceIdentity {
        namespace: "test".into(),
        service: service.into(),
    };
    config.routes.push(RouteConfig {
        name: "all".into(),
        host: None,
        path_prefix: Some("/".into()),
        target_service: "callee".into(),
        priority: 0,
    });
    config.services.push(ServiceConfig {
        name: "callee".into(),
        instances: instances.iter().map(ToString::to_string).collect(),
    });
    config
}

pub fn with_metadata(
    mut config: GatewayConfig,
    content: &[(&str, &str)],
    transitive: &[&str],
    disposable: &[&str],
) -> GatewayConfig {
    config.metadata = MetadataConfig {
        content: map(content),
        transitive: transitive.iter().map(|s| s.to_string()).collect(),
        disposable: disposable.iter().map(|s| s.to_string()).collect(),
    };
    config
}

pub fn with_rule(mut config: GatewayConfig, labels: &[&str]) -> GatewayConfig {
    config.router.rules.push(LabelRuleConfig {
        source_namespace: config.service.namespace.clone(),
        source_service: config.service.service.clone(),
        target_service: "callee".into(),
        expression_labels: labels.iter().map(|s| s.to_string()).collect(),
    });
    config
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    start_gateway_with(config, Arc::new(PassthroughEngine), Vec::new()).await
}

/// Start a gateway whose static metadata ignores the process environment.
pub async fn start_gateway_with(
    config: GatewayConfig,
    engine: Arc<dyn DecisionEngine>,
    resolvers: Vec<Arc<dyn RouterLabelResolver>>,
) -> TestGateway {
    let statics = Arc::new(StaticMetadataManager::from_sources(
        &config.metadata,
        Vec::<(String, String)>::new(),
    ));
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::with_components(config, statics, engine, resolvers);
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestGateway { addr, shutdown }
}
