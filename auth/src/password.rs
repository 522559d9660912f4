//! Password hashing.
//!
//! Argon2id with the OWASP-recommended baseline cost: 19 MiB of memory, two
//! iterations, one lane. Hashes are PHC strings, so the algorithm, version,
//! cost and salt travel with the hash and verification needs no extra state.
//!
//! Hashing is CPU-bound (tens of milliseconds). Async callers should run it on
//! a blocking thread.

use crate::error::HashError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// One-way salted password hasher.
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
}

impl SecretHasher {
    /// Hasher with the default production cost (m=19456 KiB, t=2, p=1).
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::DEFAULT),
        }
    }

    /// Hasher with explicit cost parameters.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::InvalidParams`] if argon2 rejects the parameters.
    pub fn with_params(m_cost_kib: u32, t_cost: u32, p_cost: u32) -> Result<Self, HashError> {
        let params = Params::new(m_cost_kib, t_cost, p_cost, None)
            .map_err(|e| HashError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash `plaintext` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if salt generation or hashing fails.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| HashError::Salt(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| HashError::Salt(e.to_string()))?;

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::Hash(e.to_string()))
    }

    /// Check `plaintext` against a stored PHC hash.
    ///
    /// Returns `false` for a mismatch and for any hash that does not parse.
    /// The digest comparison is constant-time.
    #[must_use]
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

impl fmt::Debug for SecretHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHasher")
            .field("algorithm", &Algorithm::Argon2id)
            .finish_non_exhaustive()
    }
}

impl Default for SecretHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cheap() -> SecretHasher {
        SecretHasher::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn same_plaintext_hashes_differently_and_both_verify() {
        let hasher = cheap();
        let first = hasher.hash("correct horse").unwrap();
        let second = hasher.hash("correct horse").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("correct horse", &first));
        assert!(hasher.verify("correct horse", &second));
    }

    #[test]
    fn wrong_password_fails() {
        let hasher = cheap();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(!hasher.verify("battery staple", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn malformed_hash_returns_false() {
        let hasher = cheap();
        assert!(!hasher.verify("anything", ""));
        assert!(!hasher.verify("anything", "not-a-phc-string"));
        assert!(!hasher.verify("anything", "$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy"));
    }

    #[test]
    fn hash_is_self_describing_argon2id() {
        let hash = SecretHasher::new().hash("pw").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
    }

    #[test]
    fn verification_uses_parameters_embedded_in_hash() {
        let hash = cheap().hash("pw").unwrap();
        assert!(SecretHasher::new().verify("pw", &hash));
    }

    #[test]
    fn rejects_invalid_params() {
        assert!(matches!(
            SecretHasher::with_params(0, 0, 0),
            Err(HashError::InvalidParams(_))
        ));
    }
}
