//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup)
//!     → request.rs (request ID)
//!     → ingress.rs (decode metadata headers, open request scope)
//!     → [routing layer decides target service]
//!     → egress.rs (encode metadata, attach router labels)
//!     → [decision engine filters, load balancer picks instance]
//!     → forward and report call result
//! ```

pub mod egress;
pub mod ingress;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::HttpServer;
