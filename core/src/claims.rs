//! Decoded identity context carried by a verified credential.

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Identity claims embedded in every credential.
///
/// Timestamps are Unix seconds, matching the JWT `iat`/`exp` registered
/// claims. A `Claims` value is rebuilt from the credential on every request
/// and lives only as long as that request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity record id.
    pub user_id: i64,
    /// Email at the time the credential was issued.
    pub email: String,
    /// Role at the time the credential was issued.
    pub role: Role,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expires-at (Unix seconds).
    pub exp: i64,
    /// Issuer; always the service's fixed issuer constant.
    pub iss: String,
}

impl Claims {
    /// `true` when the credential is expired at `now` (Unix seconds).
    ///
    /// A credential is expired once `now` reaches `exp`.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    /// `true` when `exp` is strictly after `iat`.
    #[must_use]
    pub const fn has_valid_window(&self) -> bool {
        self.exp > self.iat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat: i64, exp: i64) -> Claims {
        Claims {
            user_id: 7,
            email: "ada@example.com".to_string(),
            role: Role::Student,
            iat,
            exp,
            iss: "student-portal-api".to_string(),
        }
    }

    #[test]
    fn expiry_is_inclusive_of_exp() {
        let c = claims(100, 200);
        assert!(!c.is_expired_at(199));
        assert!(c.is_expired_at(200));
        assert!(c.is_expired_at(201));
    }

    #[test]
    fn window_must_be_positive() {
        assert!(claims(100, 200).has_valid_window());
        assert!(!claims(200, 200).has_valid_window());
        assert!(!claims(300, 200).has_valid_window());
    }
}
