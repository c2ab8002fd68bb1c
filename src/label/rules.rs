//! Expression label keys declared by routing rules.
//!
//! # Design Decisions
//! - Keyed on the (source namespace, source service, target service) triple
//! - A rule with target `*` applies to every callee of that source
//! - The registry is concurrent so rules can be replaced while serving

use std::collections::HashSet;

use dashmap::DashMap;

use crate::config::schema::LabelRuleConfig;

/// Target service wildcard.
pub const ANY_SERVICE: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub source_namespace: String,
    pub source_service: String,
    pub target_service: String,
}

impl RouteKey {
    pub fn new(
        source_namespace: impl Into<String>,
        source_service: impl Into<String>,
        target_service: impl Into<String>,
    ) -> Self {
        Self {
            source_namespace: source_namespace.into(),
            source_service: source_service.into(),
            target_service: target_service.into(),
        }
    }

    fn wildcard(&self) -> Self {
        Self {
            target_service: ANY_SERVICE.to_string(),
            ..self.clone()
        }
    }
}

/// Source of the expression label keys a routing rule needs.
pub trait ExpressionLabelKeyProvider: Send + Sync {
    fn expression_label_keys(&self, key: &RouteKey) -> HashSet<String>;
}

#[derive(Debug, Default)]
pub struct RuleLabelKeyRegistry {
    rules: DashMap<RouteKey, HashSet<String>>,
}

impl RuleLabelKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(rules: &[LabelRuleConfig]) -> Self {
        let registry = Self::new();
        for rule in rules {
            let key = RouteKey::new(
                &rule.source_namespace,
                &rule.source_service,
                &rule.target_service,
            );
            registry
                .rules
                .entry(key)
                .or_default()
                .extend(rule.expression_labels.iter().cloned());
        }
        tracing::debug!(rules = registry.rules.len(), "Loaded routing label rules");
        registry
    }

    /// Replace the keys for one route.
    pub fn upsert(&self, key: RouteKey, labels: HashSet<String>) {
        self.rules.insert(key, labels);
    }

    pub fn remove(&self, key: &RouteKey) -> Option<HashSet<String>> {
        self.rules.remove(key).map(|(_, labels)| labels)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ExpressionLabelKeyProvider for RuleLabelKeyRegistry {
    fn expression_label_keys(&self, key: &RouteKey) -> HashSet<String> {
        if let Some(labels) = self.rules.get(key) {
            return labels.clone();
        }
        self.rules
            .get(&key.wildcard())
            .map(|labels| labels.clone())
            .unwrap_or_default()
    }
}
