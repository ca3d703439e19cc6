//! Error types for Portcullis Core.

use thiserror::Error;

/// Core errors raised while building primitives from caller input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid location {input:?}: {reason}")]
    InvalidLocation { input: String, reason: &'static str },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
