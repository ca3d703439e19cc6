//! Error types for navigation guarding.

use portcullis_pipeline::PipelineError;
use thiserror::Error;

/// Errors that can occur while resolving or guarding a navigation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// Pipeline error (unknown guard, reused pipeline).
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// A route record cannot be used.
    #[error("invalid route {path:?}: {reason}")]
    InvalidRoute { path: String, reason: String },

    /// Two route records share a name.
    #[error("duplicate route name: {0}")]
    DuplicateRouteName(String),
}

/// Result type for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
