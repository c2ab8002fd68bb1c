//! Decision engine seam.
//!
//! The routing, rate-limit and circuit-breaker decisions are made by an
//! external engine. This module defines what the gateway hands it: the
//! router labels of an outbound call and the call result afterwards.
//!
//! # Data Flow
//! ```text
//! router labels
//!     → get_quota (Allow | Deny)
//!     → resolve_route (candidates filtered by labels)
//!     → forward
//!     → reporter.rs (ServiceCallResult)
//!     → report_call_result
//! ```

pub mod reporter;

use serde::Serialize;

use crate::load_balancer::Instance;
use crate::metadata::MetadataMap;

/// Outcome class of one downstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetStatus {
    Success,
    Fail,
    Timeout,
}

/// Result of one downstream call, reported after the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCallResult {
    pub namespace: String,
    pub service: String,
    /// Request path of the call.
    pub method: String,
    pub host: String,
    pub port: u16,
    pub status: RetStatus,
    /// HTTP status code, `None` when no response arrived.
    pub ret_code: Option<u16>,
    pub delay_ms: u64,
    pub labels: MetadataMap,
    pub caller_namespace: String,
    pub caller_service: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaResult {
    Allow,
    Deny { reason: String },
}

pub trait DecisionEngine: Send + Sync {
    fn report_call_result(&self, result: ServiceCallResult);

    /// Candidates eligible for a call carrying `labels`.
    fn resolve_route(&self, candidates: Vec<Instance>, labels: &MetadataMap) -> Vec<Instance>;

    fn get_quota(&self, resource: &str, labels: &MetadataMap) -> QuotaResult;
}

/// Allows every call and keeps every candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughEngine;

impl DecisionEngine for PassthroughEngine {
    fn report_call_result(&self, result: ServiceCallResult) {
        tracing::debug!(
            service = %result.service,
            host = %result.host,
            port = result.port,
            status = ?result.status,
            delay_ms = result.delay_ms,
            "Call result"
        );
    }

    fn resolve_route(&self, candidates: Vec<Instance>, _labels: &MetadataMap) -> Vec<Instance> {
        candidates
    }

    fn get_quota(&self, _resource: &str, _labels: &MetadataMap) -> QuotaResult {
        QuotaResult::Allow
    }
}
