//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::metadata::{MetadataMap, ServiceIdentity};

/// Root configuration for the metadata gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Identity of the local service.
    pub service: ServiceIdentity,

    /// Static metadata of the local service.
    pub metadata: MetadataConfig,

    /// Routing-rule expression labels.
    pub router: RouterConfig,

    /// Route definitions mapping requests to target services.
    pub routes: Vec<RouteConfig>,

    /// Known downstream services and their instances.
    pub services: Vec<ServiceConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin listener settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Static metadata from the config file.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MetadataConfig {
    /// All local metadata entries.
    pub content: MetadataMap,

    /// Keys of `content` forwarded to every downstream hop.
    pub transitive: Vec<String>,

    /// Keys of `content` sent to the next hop only.
    pub disposable: Vec<String>,
}

/// Routing-rule label key declarations.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    pub rules: Vec<LabelRuleConfig>,
}

/// Expression labels a routing rule reads for one caller/callee pair.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelRuleConfig {
    pub source_namespace: String,
    pub source_service: String,

    /// Callee service name, or `*` for any callee.
    pub target_service: String,

    /// Expression keys such as `$header.x-user` or `$query.uid`.
    #[serde(default)]
    pub expression_labels: Vec<String>,
}

/// Route configuration mapping requests to a target service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Host header to match (exact match).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    /// Service name to forward to.
    pub target_service: String,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Downstream service with static instances.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,

    /// Instance addresses (e.g., "127.0.0.1:3000").
    #[serde(default)]
    pub instances: Vec<String>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin listener bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.timeouts.request_secs, 30);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(config.metadata.content.is_empty());
    }

    #[test]
    fn test_full_config_parses() {
        let raw = r#"
            [service]
            namespace = "prod"
            service = "caller"

            [metadata]
            content = { env = "prod", lane = "blue" }
            transitive = ["lane"]

            [[router.rules]]
            source_namespace = "prod"
            source_service = "caller"
            target_service = "callee"
            expression_labels = ["$header.x-user", "$method"]

            [[routes]]
            name = "api"
            path_prefix = "/api"
            target_service = "callee"

            [[services]]
            name = "callee"
            instances = ["127.0.0.1:3000"]

            [observability]
            log_format = "json"
        "#;
        let config: GatewayConfig = toml::from_str(raw).unwrap();

        assert_eq!(config.service.service, "caller");
        assert_eq!(config.metadata.content.get("lane").map(String::as_str), Some("blue"));
        assert_eq!(config.metadata.transitive, vec!["lane".to_string()]);
        assert_eq!(config.router.rules[0].expression_labels.len(), 2);
        assert_eq!(config.routes[0].priority, 0);
        assert_eq!(config.services[0].instances, vec!["127.0.0.1:3000".to_string()]);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
