//! Request metadata propagation for a service mesh.
//!
//! Carries request-scoped labels across hops in HTTP headers, scopes them
//! to the logical request, and assembles the router labels consumed by
//! routing, rate limiting and circuit breaking.

pub mod error;
pub mod metadata;
pub mod transport;
pub mod label;

pub mod config;
pub mod engine;
pub mod http;
pub mod routing;
pub mod load_balancer;
pub mod lifecycle;
pub mod observability;
pub mod admin;

pub use config::schema::GatewayConfig;
pub use error::MetadataError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use metadata::{Fragment, MetadataContext, MetadataContextHolder, MetadataMap, StaticMetadataManager};
