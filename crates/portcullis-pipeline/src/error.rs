//! Error types for the guard pipeline.

use thiserror::Error;

/// Errors raised while building or running a pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// A destination names a guard that was never registered.
    #[error("unknown guard: {0}")]
    UnknownGuard(String),

    /// The pipeline already ran; rebuild it to traverse again.
    #[error("pipeline already traversed; rebuild it to run again")]
    Exhausted,
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
