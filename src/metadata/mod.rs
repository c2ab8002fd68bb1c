//! Request-scoped metadata subsystem.
//!
//! # Data Flow
//! ```text
//! Process start:
//!     config [metadata] + SCT_METADATA_* env
//!     → static_manager.rs (merge once, env wins)
//!     → StaticMetadataManager (immutable, shared via Arc)
//!
//! Per request:
//!     ingress decode (upstream headers)
//!     → holder.rs init (upstream over static defaults)
//!     → context.rs MetadataContext (copy-on-write fragments)
//!     → application reads / mutates
//!     → egress encode
//!     → holder.rs remove (every exit path)
//! ```
//!
//! # Design Decisions
//! - Static maps are never edited after startup; requests overlay them
//! - Fragments are whole-map replacements, readers never see partial maps
//! - Request scope is a task-local (async) or a guarded thread binding (sync)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub mod context;
pub mod holder;
pub mod static_manager;

pub use context::{Fragment, MetadataContext};
pub use holder::MetadataContextHolder;
pub use static_manager::{Location, StaticMetadataManager};

/// Flat string map used for every fragment, label set and header payload.
pub type MetadataMap = HashMap<String, String>;

/// Namespace and service name of the local process.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceIdentity {
    pub namespace: String,
    pub service: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            service: "unknown-service".to_string(),
        }
    }
}
