//! Router label resolution subsystem.
//!
//! # Data Flow
//! ```text
//! outbound request + target service
//!     → rules.rs (expression label keys for the route)
//!     → expression.rs (evaluate keys against request attributes)
//!     → resolver.rs (merge with local, custom and transitive labels)
//!     → router-label header
//! ```
//!
//! # Design Decisions
//! - Resolvers are registered at build time, not discovered at runtime
//! - Resolver faults are contained per resolver and never fail the call

pub mod expression;
pub mod resolver;
pub mod rules;

pub use resolver::{LabelResolver, ResolverError, RouterLabelResolver};
pub use rules::{ExpressionLabelKeyProvider, RouteKey, RuleLabelKeyRegistry};
