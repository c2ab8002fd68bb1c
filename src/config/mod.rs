//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → [metadata] feeds StaticMetadataManager once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, GatewayConfig, LabelRuleConfig, ListenerConfig, LogFormat, MetadataConfig,
    ObservabilityConfig, RouteConfig, RouterConfig, ServiceConfig, TimeoutConfig,
};
