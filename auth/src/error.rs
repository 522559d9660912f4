//! Error types for credential and password operations.

use portal_core::ServiceError;
use thiserror::Error;

/// Reasons a credential can be rejected, or fail to be issued.
///
/// The variants exist for server-side diagnostics only. Every verification
/// failure converts to [`ServiceError::Authentication`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Not a decodable JWT, or the payload does not match the claim shape.
    #[error("Malformed credential: {0}")]
    Malformed(String),

    /// The header advertises an algorithm other than the configured one.
    #[error("Unexpected signing algorithm: {0}")]
    AlgorithmMismatch(String),

    /// Signature does not match the process secret.
    #[error("Signature verification failed")]
    BadSignature,

    /// Issuer claim is not this service.
    #[error("Issuer mismatch")]
    IssuerMismatch,

    /// `exp` is not after `iat`.
    #[error("Invalid validity window")]
    InvalidWindow,

    /// `exp` has passed.
    #[error("Credential expired")]
    Expired,

    /// A credential was requested with a zero or negative lifetime.
    #[error("Credential lifetime must be positive, got {0}s")]
    InvalidTtl(i64),

    /// Signing a new credential failed.
    #[error("Failed to sign credential: {0}")]
    Signing(String),
}

impl CredentialError {
    /// Short machine-readable label, used as a log field.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::AlgorithmMismatch(_) => "algorithm_mismatch",
            Self::BadSignature => "bad_signature",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::InvalidWindow => "invalid_window",
            Self::Expired => "expired",
            Self::InvalidTtl(_) => "invalid_ttl",
            Self::Signing(_) => "signing_failed",
        }
    }
}

impl From<CredentialError> for ServiceError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Signing(detail) => Self::Internal(detail),
            invalid @ CredentialError::InvalidTtl(_) => Self::Internal(invalid.to_string()),
            _ => Self::Authentication,
        }
    }
}

/// Errors produced while hashing a password.
///
/// Verification never fails loudly; it returns `false` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Cost parameters were rejected.
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),

    /// Salt generation or encoding failed.
    #[error("Salt generation failed: {0}")]
    Salt(String),

    /// The hashing primitive failed.
    #[error("Hashing failed: {0}")]
    Hash(String),
}

impl From<HashError> for ServiceError {
    fn from(err: HashError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rejection_collapses_to_authentication() {
        let rejections = [
            CredentialError::Malformed("bad base64".to_string()),
            CredentialError::AlgorithmMismatch("HS512".to_string()),
            CredentialError::BadSignature,
            CredentialError::IssuerMismatch,
            CredentialError::InvalidWindow,
            CredentialError::Expired,
        ];

        for err in rejections {
            assert_eq!(ServiceError::from(err), ServiceError::Authentication);
        }
    }

    #[test]
    fn signing_failure_is_internal() {
        let err = ServiceError::from(CredentialError::Signing("key".to_string()));
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[test]
    fn non_positive_ttl_is_internal() {
        let err = ServiceError::from(CredentialError::InvalidTtl(0));
        assert!(matches!(err, ServiceError::Internal(_)));
    }
}
