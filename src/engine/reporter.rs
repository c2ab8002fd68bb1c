//! Call result assembly for the decision engine.
//!
//! # Responsibilities
//! - Classify the call outcome (success, fail, timeout)
//! - Recover the router labels sent with the call
//! - Identify the instance from the LoadBalancer fragment, or the URI

use std::time::Duration;

use axum::http::StatusCode;

use crate::engine::{RetStatus, ServiceCallResult};
use crate::metadata::context::{LOAD_BALANCER_HOST, LOAD_BALANCER_PORT, LOAD_BALANCER_SERVICE};
use crate::metadata::{MetadataContext, ServiceIdentity};
use crate::transport::{codec, TransportRequest, ROUTER_LABEL_HEADER};

const DEFAULT_PORT: u16 = 80;

/// How a downstream call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Response(StatusCode),
    Error,
    Timeout,
}

impl CallOutcome {
    pub fn status(self) -> RetStatus {
        match self {
            Self::Response(code) if code.is_server_error() => RetStatus::Fail,
            Self::Response(_) => RetStatus::Success,
            Self::Error => RetStatus::Fail,
            Self::Timeout => RetStatus::Timeout,
        }
    }

    pub fn ret_code(self) -> Option<u16> {
        match self {
            Self::Response(code) => Some(code.as_u16()),
            Self::Error | Self::Timeout => None,
        }
    }
}

/// Build the result of one outbound call.
pub fn build_call_result(
    outbound: &dyn TransportRequest,
    context: &MetadataContext,
    caller: &ServiceIdentity,
    outcome: CallOutcome,
    delay: Duration,
) -> ServiceCallResult {
    let labels = codec::decode_all(&ROUTER_LABEL_HEADER, outbound.header_values(&ROUTER_LABEL_HEADER));

    let chosen = context.get_load_balancer_metadata();
    let uri = outbound.request_uri();
    let service = chosen
        .get(LOAD_BALANCER_SERVICE)
        .cloned()
        .or_else(|| uri.host().map(str::to_string))
        .unwrap_or_default();
    let host = chosen
        .get(LOAD_BALANCER_HOST)
        .cloned()
        .or_else(|| uri.host().map(str::to_string))
        .unwrap_or_default();
    let port = chosen
        .get(LOAD_BALANCER_PORT)
        .and_then(|port| port.parse().ok())
        .or_else(|| uri.port_u16())
        .unwrap_or(DEFAULT_PORT);

    ServiceCallResult {
        namespace: caller.namespace.clone(),
        service,
        method: outbound.request_path().to_string(),
        host,
        port,
        status: outcome.status(),
        ret_code: outcome.ret_code(),
        delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        labels,
        caller_namespace: caller.namespace.clone(),
        caller_service: caller.service.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataMap;
    use axum::http::Request;

    fn caller() -> ServiceIdentity {
        ServiceIdentity {
            namespace: "prod".into(),
            service: "caller".into(),
        }
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(CallOutcome::Response(StatusCode::OK).status(), RetStatus::Success);
        assert_eq!(CallOutcome::Response(StatusCode::NOT_FOUND).status(), RetStatus::Success);
        assert_eq!(CallOutcome::Response(StatusCode::BAD_GATEWAY).status(), RetStatus::Fail);
        assert_eq!(CallOutcome::Error.status(), RetStatus::Fail);
        assert_eq!(CallOutcome::Timeout.status(), RetStatus::Timeout);
        assert_eq!(CallOutcome::Timeout.ret_code(), None);
    }

    #[test]
    fn test_result_from_load_balancer_fragment() {
        let labels: MetadataMap = [("lane".to_string(), "blue".to_string())].into();
        let req = Request::builder()
            .uri("http://10.0.0.5:3000/orders")
            .header(ROUTER_LABEL_HEADER, codec::encode(&labels))
            .body(())
            .unwrap();
        let context = MetadataContext::new();
        context.set_load_balancer_instance("callee", "10.0.0.5", 3000);

        let result = build_call_result(
            &req,
            &context,
            &caller(),
            CallOutcome::Response(StatusCode::OK),
            Duration::from_millis(12),
        );

        assert_eq!(result.service, "callee");
        assert_eq!(result.host, "10.0.0.5");
        assert_eq!(result.port, 3000);
        assert_eq!(result.method, "/orders");
        assert_eq!(result.ret_code, Some(200));
        assert_eq!(result.delay_ms, 12);
        assert_eq!(result.labels, labels);
        assert_eq!(result.caller_service, "caller");
    }

    #[test]
    fn test_result_defaults_without_fragment() {
        let req = Request::builder()
            .uri("http://backend.local/x")
            .header(ROUTER_LABEL_HEADER, "garbage")
            .body(())
            .unwrap();

        let result = build_call_result(
            &req,
            &MetadataContext::new(),
            &caller(),
            CallOutcome::Error,
            Duration::ZERO,
        );

        assert_eq!(result.host, "backend.local");
        assert_eq!(result.port, 80);
        assert_eq!(result.status, RetStatus::Fail);
        assert!(result.labels.is_empty());
    }
}
