//! Metrics collection and exposition.
//!
//! # Metrics
//! - `metadata_decode_failures_total` (counter): header payloads dropped to empty, by header and stage
//! - `metadata_label_resolver_failures_total` (counter): custom resolver errors/panics, by resolver
//! - `metadata_router_label_headers_total` (counter): router-label header attached or cleared
//! - `gateway_requests_total` (counter): proxied requests by method, status, upstream
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Stage at which a metadata header payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// Header bytes were not visible ASCII.
    Header,
    /// Percent-decoding did not yield UTF-8.
    Percent,
    /// Payload was not a flat JSON object of strings.
    Json,
}

impl DecodeStage {
    fn as_str(self) -> &'static str {
        match self {
            DecodeStage::Header => "header",
            DecodeStage::Percent => "percent",
            DecodeStage::Json => "json",
        }
    }
}

pub fn record_decode_failure(header: &str, stage: DecodeStage) {
    metrics::counter!(
        "metadata_decode_failures_total",
        "header" => header.to_string(),
        "stage" => stage.as_str()
    )
    .increment(1);
}

pub fn record_resolver_failure(resolver: &str) {
    metrics::counter!(
        "metadata_label_resolver_failures_total",
        "resolver" => resolver.to_string()
    )
    .increment(1);
}

pub fn record_router_label_header(attached: bool) {
    let outcome = if attached { "attached" } else { "cleared" };
    metrics::counter!("metadata_router_label_headers_total", "outcome" => outcome).increment(1);
}

pub fn record_request(method: &str, status: u16, upstream: &str, start: Instant) {
    let duration = start.elapsed().as_secs_f64();

    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "upstream" => upstream.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "upstream" => upstream.to_string()
    )
    .record(duration);
}
