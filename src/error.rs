//! Crate-level error types.
//!
//! Per-request metadata faults never surface as errors; they degrade to
//! empty maps. What remains here are wiring mistakes made at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    /// `MetadataContextHolder::global()` called before `install()`.
    #[error("metadata context holder is not installed; call MetadataContextHolder::install at startup")]
    HolderNotInstalled,

    #[error("metadata context holder is already installed")]
    HolderAlreadyInstalled,
}
