//! Credential configuration.
//!
//! Values are supplied by the application at startup and never change
//! afterwards.

use chrono::Duration;
use std::fmt;
use thiserror::Error;

/// Default credential lifetime.
pub const DEFAULT_TTL: Duration = Duration::hours(24);

/// Rejected credential configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthConfigError {
    /// The signing secret is empty.
    #[error("JWT secret must not be empty")]
    EmptySecret,

    /// The credential lifetime is zero or negative.
    #[error("Credential TTL must be positive")]
    NonPositiveTtl,
}

/// Immutable credential configuration.
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    ttl: Duration,
}

impl AuthConfig {
    /// Create a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthConfigError`] if the secret is empty or the TTL is not
    /// positive.
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Result<Self, AuthConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthConfigError::EmptySecret);
        }
        if ttl <= Duration::zero() {
            return Err(AuthConfigError::NonPositiveTtl);
        }
        Ok(Self { secret, ttl })
    }

    /// Signing secret bytes.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Credential lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let config = AuthConfig::new("hunter2-but-longer", DEFAULT_TTL).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn rejects_empty_secret_and_non_positive_ttl() {
        assert_eq!(
            AuthConfig::new("", DEFAULT_TTL).unwrap_err(),
            AuthConfigError::EmptySecret
        );
        assert_eq!(
            AuthConfig::new("secret", Duration::zero()).unwrap_err(),
            AuthConfigError::NonPositiveTtl
        );
    }
}
