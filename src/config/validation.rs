//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference declared services)
//! - Validate value ranges and address formats
//! - Reject expression label keys the resolver cannot evaluate
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::label::expression::is_valid_expression_key;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.namespace.trim().is_empty() {
        errors.push(ValidationError::new("service.namespace", "must not be empty"));
    }
    if config.service.service.trim().is_empty() {
        errors.push(ValidationError::new("service.service", "must not be empty"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address '{}'", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    let mut services = HashSet::new();
    for (i, service) in config.services.iter().enumerate() {
        if !services.insert(service.name.as_str()) {
            errors.push(ValidationError::new(
                format!("services[{i}].name"),
                format!("duplicate service '{}'", service.name),
            ));
        }
        for (j, instance) in service.instances.iter().enumerate() {
            if instance.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::new(
                    format!("services[{i}].instances[{j}]"),
                    format!("invalid instance address '{instance}'"),
                ));
            }
        }
    }

    for (i, route) in config.routes.iter().enumerate() {
        if !services.contains(route.target_service.as_str()) {
            errors.push(ValidationError::new(
                format!("routes[{i}].target_service"),
                format!("unknown service '{}'", route.target_service),
            ));
        }
    }

    for (i, rule) in config.router.rules.iter().enumerate() {
        for key in &rule.expression_labels {
            if !is_valid_expression_key(key) {
                errors.push(ValidationError::new(
                    format!("router.rules[{i}].expression_labels"),
                    format!("unsupported expression label '{key}'"),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
