//! Credential issuance and verification.
//!
//! Credentials are compact JWTs signed with HMAC-SHA256 over the process-wide
//! secret. Verification is strict:
//!
//! 1. The header's `alg` must be exactly HS256. This check runs before any
//!    signature work so an attacker cannot substitute `none` or an asymmetric
//!    algorithm.
//! 2. The signature must match the configured secret.
//! 3. `iss` must equal [`ISSUER`].
//! 4. `exp` must be after `iat`, and after the injected clock's `now`.
//!
//! Expiry is checked against the injected [`Clock`] rather than inside
//! `jsonwebtoken`, which reads the system time directly.

use crate::config::AuthConfig;
use crate::error::CredentialError;
use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode};
use portal_core::environment::Clock;
use portal_core::{Claims, Role};
use std::fmt;
use std::sync::Arc;

/// Fixed issuer embedded in every credential.
pub const ISSUER: &str = "student-portal-api";

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and verifies signed identity credentials.
#[derive(Clone)]
pub struct CredentialAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CredentialAuthority {
    /// Build an authority bound to `config`'s secret and TTL.
    #[must_use]
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret()),
            decoding_key: DecodingKey::from_secret(config.secret()),
            validation,
            ttl: config.ttl(),
            clock,
        }
    }

    /// Configured credential lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a credential with the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Signing`] if the token cannot be encoded.
    pub fn issue(&self, user_id: i64, email: &str, role: Role) -> Result<String, CredentialError> {
        self.issue_with_ttl(user_id, email, role, self.ttl)
    }

    /// Issue a credential valid for `ttl` from the clock's `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidTtl`] if `ttl` is not at least one
    /// second, and [`CredentialError::Signing`] if the token cannot be
    /// encoded.
    pub fn issue_with_ttl(
        &self,
        user_id: i64,
        email: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<String, CredentialError> {
        let lifetime = ttl.num_seconds();
        if lifetime <= 0 {
            tracing::error!(
                ttl_secs = lifetime,
                "Refusing to issue credential with non-positive lifetime"
            );
            return Err(CredentialError::InvalidTtl(lifetime));
        }

        let iat = self.clock.now().timestamp();
        let claims = Claims {
            user_id,
            email: email.to_string(),
            role,
            iat,
            exp: iat.saturating_add(lifetime),
            iss: ISSUER.to_string(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| CredentialError::Signing(e.to_string()))?;

        tracing::debug!(user_id, role = %role, exp = claims.exp, "Issued credential");
        Ok(token)
    }

    /// Verify a credential and return its claims.
    ///
    /// # Errors
    ///
    /// Returns a [`CredentialError`] naming the first check that failed. All
    /// of them map to the same externally visible authentication failure.
    pub fn verify(&self, token: &str) -> Result<Claims, CredentialError> {
        let header = decode_header(token).map_err(|e| CredentialError::Malformed(e.to_string()))?;
        if header.alg != ALGORITHM {
            return Err(CredentialError::AlgorithmMismatch(format!("{:?}", header.alg)));
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(classify)?
            .claims;

        if !claims.has_valid_window() {
            return Err(CredentialError::InvalidWindow);
        }
        if claims.is_expired_at(self.clock.now().timestamp()) {
            return Err(CredentialError::Expired);
        }

        Ok(claims)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> CredentialError {
    match err.kind() {
        ErrorKind::InvalidSignature => CredentialError::BadSignature,
        ErrorKind::InvalidAlgorithm => CredentialError::AlgorithmMismatch(err.to_string()),
        ErrorKind::InvalidIssuer => CredentialError::IssuerMismatch,
        ErrorKind::ExpiredSignature => CredentialError::Expired,
        _ => CredentialError::Malformed(err.to_string()),
    }
}

impl fmt::Debug for CredentialAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialAuthority")
            .field("algorithm", &ALGORITHM)
            .field("issuer", &ISSUER)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TTL;
    use portal_testing::mocks::{FixedClock, test_clock};
    use serde_json::json;

    const SECRET: &str = "test-secret-with-enough-entropy";

    fn authority(clock: &FixedClock) -> CredentialAuthority {
        let config = AuthConfig::new(SECRET, DEFAULT_TTL).unwrap();
        CredentialAuthority::new(&config, Arc::new(clock.clone()))
    }

    #[test]
    fn issued_credential_verifies_to_same_claims() {
        let clock = test_clock();
        let authority = authority(&clock);

        let token = authority.issue(42, "ada@example.com", Role::Admin).unwrap();
        let claims = authority.verify(&token).unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.iat, clock.now().timestamp());
        assert_eq!(claims.exp - claims.iat, DEFAULT_TTL.num_seconds());
    }

    #[test]
    fn token_has_three_segments() {
        let authority = authority(&test_clock());
        let token = authority.issue(1, "a@b.co", Role::Student).unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn rejects_once_clock_reaches_expiry() {
        let clock = test_clock();
        let authority = authority(&clock);
        let token = authority
            .issue_with_ttl(1, "a@b.co", Role::Student, Duration::seconds(60))
            .unwrap();

        clock.advance(Duration::seconds(59));
        assert!(authority.verify(&token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(authority.verify(&token).unwrap_err(), CredentialError::Expired);
    }

    #[test]
    fn refuses_to_issue_with_non_positive_ttl() {
        let authority = authority(&test_clock());

        for ttl in [Duration::zero(), Duration::seconds(-30), Duration::milliseconds(500)] {
            let result = authority.issue_with_ttl(1, "a@b.co", Role::Student, ttl);
            assert!(
                matches!(result, Err(CredentialError::InvalidTtl(_))),
                "{ttl:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn rejects_credential_signed_with_other_secret() {
        let clock = test_clock();
        let other = CredentialAuthority::new(
            &AuthConfig::new("some-other-secret", DEFAULT_TTL).unwrap(),
            Arc::new(clock.clone()),
        );
        let token = other.issue(1, "a@b.co", Role::Student).unwrap();

        assert_eq!(
            authority(&clock).verify(&token).unwrap_err(),
            CredentialError::BadSignature
        );
    }

    #[test]
    fn rejects_other_algorithm_even_with_correct_secret() {
        let clock = test_clock();
        let iat = clock.now().timestamp();
        let claims = json!({
            "user_id": 1,
            "email": "a@b.co",
            "role": "admin",
            "iat": iat,
            "exp": iat + 3600,
            "iss": ISSUER,
        });
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            authority(&clock).verify(&token).unwrap_err(),
            CredentialError::AlgorithmMismatch(_)
        ));
    }

    #[test]
    fn rejects_unsigned_token() {
        // {"alg":"none","typ":"JWT"}.{"user_id":1}.
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJ1c2VyX2lkIjoxfQ.";
        assert!(matches!(
            authority(&test_clock()).verify(token).unwrap_err(),
            CredentialError::Malformed(_)
        ));
    }

    #[test]
    fn rejects_garbage() {
        let authority = authority(&test_clock());
        for token in ["", "not-a-jwt", "a.b.c", "...."] {
            assert!(matches!(
                authority.verify(token).unwrap_err(),
                CredentialError::Malformed(_)
            ));
        }
    }

    #[test]
    fn rejects_foreign_issuer() {
        let clock = test_clock();
        let iat = clock.now().timestamp();
        let claims = json!({
            "user_id": 1,
            "email": "a@b.co",
            "role": "student",
            "iat": iat,
            "exp": iat + 3600,
            "iss": "someone-else",
        });
        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            authority(&clock).verify(&token).unwrap_err(),
            CredentialError::IssuerMismatch
        );
    }

    #[test]
    fn rejects_unknown_role() {
        let clock = test_clock();
        let iat = clock.now().timestamp();
        let claims = json!({
            "user_id": 1,
            "email": "a@b.co",
            "role": "superuser",
            "iat": iat,
            "exp": iat + 3600,
            "iss": ISSUER,
        });
        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            authority(&clock).verify(&token).unwrap_err(),
            CredentialError::Malformed(_)
        ));
    }

    #[test]
    fn rejects_inverted_window() {
        let clock = test_clock();
        let iat = clock.now().timestamp();
        let claims = json!({
            "user_id": 1,
            "email": "a@b.co",
            "role": "student",
            "iat": iat + 7200,
            "exp": iat + 3600,
            "iss": ISSUER,
        });
        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            authority(&clock).verify(&token).unwrap_err(),
            CredentialError::InvalidWindow
        );
    }

    #[test]
    fn debug_omits_keys() {
        let rendered = format!("{:?}", authority(&test_clock()));
        assert!(!rendered.contains(SECRET));
    }
}
