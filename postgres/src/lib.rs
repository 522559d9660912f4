//! `PostgreSQL` user repository for the student portal.
//!
//! This crate implements the `UserRepository` trait from `portal-core` on a
//! sqlx connection pool. Queries are checked at runtime, so building the
//! crate needs no database.
//!
//! - Unique violations on `email` map to `RepositoryError::Conflict`
//! - Missing rows map to `RepositoryError::NotFound`
//! - Everything else maps to `RepositoryError::Internal`, with the driver
//!   message kept for server-side logs
//!
//! # Example
//!
//! ```ignore
//! use portal_postgres::{PostgresUserRepository, connect};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/student_portal", 10).await?;
//!     let repo = PostgresUserRepository::new(pool);
//!     repo.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod user;

pub use user::PostgresUserRepository;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

/// Errors from pool setup and migrations.
#[derive(Error, Debug)]
pub enum PostgresError {
    /// Could not open the connection pool.
    #[error("Failed to connect to PostgreSQL: {0}")]
    Connect(#[source] sqlx::Error),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open a connection pool and verify it with one round-trip.
///
/// # Errors
///
/// Returns [`PostgresError::Connect`] if no connection can be established
/// within the acquire timeout.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, PostgresError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(PostgresError::Connect)?;

    tracing::info!(max_connections, "Connected to PostgreSQL");
    Ok(pool)
}
