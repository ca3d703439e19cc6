//! Error types for the access facade.

use portcullis_router::RouterError;
use thiserror::Error;

/// Errors that can occur during access operations.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The configuration is unusable, or a feature was used without being set up.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Navigation error (unknown guard, invalid route table).
    #[error("router error: {0}")]
    Router(#[from] RouterError),

    /// Configuration JSON could not be parsed.
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
