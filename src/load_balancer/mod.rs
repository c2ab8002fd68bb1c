//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → target service identified
//!     → pool.rs (instances of the service)
//!     → decision engine (filter candidates by router labels)
//!     → round_robin.rs (rotate through remaining candidates)
//!     → chosen Instance recorded in the LoadBalancer fragment
//! ```
//!
//! # Design Decisions
//! - Instance lists are static and built once from configuration
//! - Selection state lives in the strategy, not in the instances

pub mod pool;
pub mod round_robin;

use std::net::SocketAddr;

use serde::Serialize;

/// One addressable instance of a downstream service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Instance {
    pub service: String,
    pub host: String,
    pub port: u16,
}

impl Instance {
    pub fn new(service: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            service: service.into(),
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }

    /// `host:port` authority for the outbound URI.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Picks one instance among routing candidates.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn choose(&self, candidates: &[Instance]) -> Option<Instance>;
}
