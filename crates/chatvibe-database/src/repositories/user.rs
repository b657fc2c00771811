//! User repository implementation.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use chatvibe_core::error::{AppError, ErrorKind};
use chatvibe_core::result::AppResult;

/// A registered account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    /// Unique username; becomes the realtime identity.
    pub username: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Creation time in milliseconds since the epoch.
    pub created_at: i64,
}

impl UserRecord {
    /// Creation time as a UTC timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.created_at)
    }
}

/// Repository for the `users` table.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a user by exact username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
        sqlx::query_as::<_, UserRecord>(
            "SELECT username, password_hash, created_at FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to find user by username", e))
    }

    /// Insert a new user. Fails with a conflict when the username is taken.
    pub async fn create(&self, username: &str, password_hash: &str) -> AppResult<UserRecord> {
        let result = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3) \
             RETURNING username, password_hash, created_at",
        )
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now().timestamp_millis())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::conflict(format!("Username '{username}' already exists")),
            ),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                "Failed to create user",
                e,
            )),
        }
    }

    /// Count registered users.
    pub async fn count(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to count users", e))
    }
}
