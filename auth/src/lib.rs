//! # Student Portal Authentication
//!
//! Credential issuance and verification plus password hashing.
//!
//! ## Components
//!
//! - [`CredentialAuthority`]: issues and verifies HS256-signed JWTs bound to a
//!   single process-wide secret.
//! - [`SecretHasher`]: salted Argon2id hashing with constant-time verification.
//!
//! Both are constructed once at startup from an immutable [`AuthConfig`] and
//! shared by reference; neither holds mutable state.
//!
//! ## Failure Collapsing
//!
//! [`CredentialAuthority::verify`] distinguishes *why* a credential was
//! rejected ([`CredentialError`]) so the cause can be logged, but every
//! rejection converts to the same [`ServiceError::Authentication`] before it
//! reaches a caller.
//!
//! ```rust,ignore
//! let authority = CredentialAuthority::new(&config, Arc::new(SystemClock));
//! let token = authority.issue(42, "ada@example.com", Role::Student)?;
//! let claims = authority.verify(&token)?;
//! assert_eq!(claims.user_id, 42);
//! ```
//!
//! [`ServiceError::Authentication`]: portal_core::ServiceError::Authentication

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod credential;
pub mod error;
pub mod password;
pub mod utils;

pub use config::AuthConfig;
pub use credential::{CredentialAuthority, ISSUER};
pub use error::{CredentialError, HashError};
pub use password::SecretHasher;
