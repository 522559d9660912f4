//! Identity record persistence contract.
//!
//! The service treats persistence purely as an interface. Every operation
//! resolves to success or one of [`RepositoryError`]'s three kinds, which the
//! service maps one-to-one onto [`ServiceError`](crate::error::ServiceError).

use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Persisted identity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Database-assigned id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Unique email.
    pub email: String,
    /// PHC-formatted password hash.
    pub password_hash: String,
    /// Role.
    pub role: Role,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create an identity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Unique email.
    pub email: String,
    /// PHC-formatted password hash.
    pub password_hash: String,
    /// Role.
    pub role: Role,
}

/// Public view of an identity record. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserResponse {
    /// Record id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Role.
    pub role: Role,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Errors returned by repository operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No record matched.
    #[error("Record not found")]
    NotFound,

    /// A unique constraint (email) was violated.
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// Anything else. The message is for server-side logs only.
    #[error("Repository error: {0}")]
    Internal(String),
}

/// Boxed future returned by [`UserRepository`] operations.
pub type RepoFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RepositoryError>> + Send + 'a>>;

/// Identity record repository.
///
/// Implementations must be safe for concurrent use; the service shares one
/// instance across all requests without additional locking.
pub trait UserRepository: Send + Sync {
    /// Insert a record and return it with its assigned id and timestamps.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] when the email is already registered.
    fn create<'a>(&'a self, user: &'a NewUser) -> RepoFuture<'a, User>;

    /// Fetch a record by id.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when no record has this id.
    fn get_by_id(&self, id: i64) -> RepoFuture<'_, User>;

    /// Fetch a record by email.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when no record has this email.
    fn get_by_email<'a>(&'a self, email: &'a str) -> RepoFuture<'a, User>;

    /// Persist name, email and role of an existing record and refresh
    /// `updated_at`.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when the record no longer exists,
    /// [`RepositoryError::Conflict`] when the new email is taken.
    fn update<'a>(&'a self, user: &'a User) -> RepoFuture<'a, User>;

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::NotFound`] when no record has this id.
    fn delete(&self, id: i64) -> RepoFuture<'_, ()>;

    /// Page through records ordered by id; returns the page and the total count.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Internal`] when the query fails.
    fn list(&self, limit: i64, offset: i64) -> RepoFuture<'_, (Vec<User>, i64)>;

    /// Cheap connectivity probe used by the readiness endpoint.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Internal`] when the backing store is unreachable.
    fn ping(&self) -> RepoFuture<'_, ()>;
}
