//! Service instance pool.
//!
//! # Responsibilities
//! - Group configured instances by service name
//! - Hold one load balancing strategy per service

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::config::ServiceConfig;
use crate::load_balancer::{round_robin::RoundRobin, Instance, LoadBalancer};

/// Instances and balancer of one service.
#[derive(Debug)]
struct ServiceGroup {
    instances: Vec<Instance>,
    balancer: Box<dyn LoadBalancer>,
}

#[derive(Debug, Default)]
pub struct InstancePool {
    services: HashMap<String, ServiceGroup>,
}

impl InstancePool {
    pub fn new(configs: &[ServiceConfig]) -> Self {
        let mut services = HashMap::new();
        for config in configs {
            let instances = config
                .instances
                .iter()
                .filter_map(|raw| match raw.parse::<SocketAddr>() {
                    Ok(addr) => Some(Instance::new(&config.name, addr)),
                    Err(_) => {
                        tracing::warn!(service = %config.name, address = %raw, "Invalid instance address");
                        None
                    }
                })
                .collect();
            services.insert(
                config.name.clone(),
                ServiceGroup {
                    instances,
                    balancer: Box::new(RoundRobin::new()),
                },
            );
        }
        Self { services }
    }

    /// All instances of `service`; empty when the service is unknown.
    pub fn candidates(&self, service: &str) -> Vec<Instance> {
        self.services
            .get(service)
            .map(|group| group.instances.clone())
            .unwrap_or_default()
    }

    /// Pick one of `candidates` with the strategy of `service`.
    pub fn choose(&self, service: &str, candidates: &[Instance]) -> Option<Instance> {
        let group = self.services.get(service)?;
        group.balancer.choose(candidates)
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }
}
