//! `PostgreSQL` user repository implementation.

use crate::PostgresError;
use chrono::{DateTime, Utc};
use portal_core::repository::RepoFuture;
use portal_core::{NewUser, RepositoryError, Role, User, UserRepository};
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, name, email, password, role, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row
            .role
            .parse()
            .map_err(|e| RepositoryError::Internal(format!("Corrupt role for user {}: {e}", row.id)))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL` user repository.
///
/// Cloning is cheap; clones share the pool.
#[derive(Clone, Debug)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a repository on an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`PostgresError::Migrate`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), PostgresError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_one_by(&self, sql: &str, bind: Binding<'_>) -> Result<User, RepositoryError> {
        let query = sqlx::query_as::<_, UserRow>(sql);
        let query = match bind {
            Binding::Id(id) => query.bind(id),
            Binding::Email(email) => query.bind(email),
        };

        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_error("fetch user", e))?
            .ok_or(RepositoryError::NotFound)?
            .try_into()
    }
}

enum Binding<'a> {
    Id(i64),
    Email(&'a str),
}

fn map_error(operation: &'static str, err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return RepositoryError::Conflict(constraint);
        }
    }
    if matches!(err, sqlx::Error::RowNotFound) {
        return RepositoryError::NotFound;
    }

    tracing::error!(error = %err, operation, "Database operation failed");
    RepositoryError::Internal(format!("Failed to {operation}: {err}"))
}

impl UserRepository for PostgresUserRepository {
    fn create<'a>(&'a self, user: &'a NewUser) -> RepoFuture<'a, User> {
        Box::pin(async move {
            let sql = format!(
                "INSERT INTO users (name, email, password, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
            );
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.role.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_error("create user", e))?
                .try_into()
        })
    }

    fn get_by_id(&self, id: i64) -> RepoFuture<'_, User> {
        Box::pin(async move {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
            self.fetch_one_by(&sql, Binding::Id(id)).await
        })
    }

    fn get_by_email<'a>(&'a self, email: &'a str) -> RepoFuture<'a, User> {
        Box::pin(async move {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
            self.fetch_one_by(&sql, Binding::Email(email)).await
        })
    }

    fn update<'a>(&'a self, user: &'a User) -> RepoFuture<'a, User> {
        Box::pin(async move {
            let sql = format!(
                "UPDATE users SET name = $2, email = $3, role = $4, updated_at = now() \
                 WHERE id = $1 RETURNING {USER_COLUMNS}"
            );
            sqlx::query_as::<_, UserRow>(&sql)
                .bind(user.id)
                .bind(&user.name)
                .bind(&user.email)
                .bind(user.role.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_error("update user", e))?
                .ok_or(RepositoryError::NotFound)?
                .try_into()
        })
    }

    fn delete(&self, id: i64) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| map_error("delete user", e))?;

            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }

    fn list(&self, limit: i64, offset: i64) -> RepoFuture<'_, (Vec<User>, i64)> {
        Box::pin(async move {
            let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_error("count users", e))?;

            let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2");
            let rows = sqlx::query_as::<_, UserRow>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_error("list users", e))?;

            let users = rows
                .into_iter()
                .map(User::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            Ok((users, total))
        })
    }

    fn ping(&self) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(|e| map_error("ping database", e))
        })
    }
}
