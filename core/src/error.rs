//! Externally visible failure taxonomy.
//!
//! Every failure that reaches a caller is one of these six kinds. Credential
//! problems of any sort (malformed, wrong algorithm, bad signature, expired)
//! are deliberately collapsed into [`ServiceError::Authentication`]; the
//! precise cause is logged where it is detected and never travels further.

use crate::repository::RepositoryError;
use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Failure kinds surfaced to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Any credential problem, or invalid login credentials.
    #[error("Authentication required")]
    Authentication,

    /// Authenticated, but the role is not permitted.
    #[error("Insufficient permissions")]
    Authorization,

    /// Malformed request body or shape.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unique-constraint violation, e.g. duplicate email.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anything unclassified. The detail is for server-side logs only.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Build a validation failure.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build an internal failure carrying server-side detail.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Resource not found".to_string()),
            RepositoryError::Conflict(_) => Self::Conflict("Email already exists".to_string()),
            RepositoryError::Internal(detail) => Self::Internal(detail),
        }
    }
}
