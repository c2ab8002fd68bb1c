//! Transport codec subsystem.
//!
//! # Data Flow
//! ```text
//! Ingress:
//!     header values (0..n occurrences)
//!     → carrier.rs (visible-ASCII values, in order)
//!     → codec.rs decode (percent-decode → JSON map, last occurrence wins)
//!
//! Egress:
//!     fragment map
//!     → codec.rs encode (JSON → percent-encode, raw fallback)
//!     → carrier.rs set/remove header
//! ```
//!
//! # Design Decisions
//! - Header names are a wire contract shared by every adapter
//! - Decode faults degrade to an empty map; they never fail a request

pub mod carrier;
pub mod codec;

pub use carrier::TransportRequest;
pub use codec::{CUSTOM_DISPOSABLE_METADATA, CUSTOM_METADATA, ROUTER_LABEL_HEADER};
