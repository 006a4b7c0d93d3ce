//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::{require_mysql, require_sqlite, DynDatabasePool};
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(require_sqlite(&self.pool)?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(require_mysql(&self.pool)?, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(require_sqlite(&self.pool)?)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(require_mysql(&self.pool)?)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                find_user_sqlite(require_sqlite(&self.pool)?, "username", username).await
            }
            DatabaseDriver::Mysql => {
                find_user_mysql(require_mysql(&self.pool)?, "username", username).await
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => find_user_sqlite(require_sqlite(&self.pool)?, "email", email).await,
            DatabaseDriver::Mysql => find_user_mysql(require_mysql(&self.pool)?, "email", email).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(require_sqlite(&self.pool)?)
                .await
                .context("Failed to count users")?,
            DatabaseDriver::Mysql => sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(require_mysql(&self.pool)?)
                .await
                .context("Failed to count users")?,
        };
        Ok(count)
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let mut created = user.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

// `column` is always one of the fixed names above, never user input.
async fn find_user_sqlite(pool: &SqlitePool, column: &str, value: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", column))?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: UserRole::from_str(&role)?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, role, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.to_string())
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    let mut created = user.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn find_user_mysql(pool: &MySqlPool, column: &str, value: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
    let row = sqlx::query(&sql)
        .bind(value)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get user by {}", column))?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: UserRole::from_str(&role)?,
        created_at: row.try_get("created_at")?,
    })
}
