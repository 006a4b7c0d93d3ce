//! Session repository
//!
//! Database operations for login sessions.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::{require_mysql, require_sqlite, DynDatabasePool};
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
                    .bind(&session.id)
                    .bind(session.user_id)
                    .bind(session.expires_at)
                    .bind(session.created_at)
                    .execute(require_sqlite(&self.pool)?)
                    .await
                    .context("Failed to create session")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
                    .bind(&session.id)
                    .bind(session.user_id)
                    .bind(session.expires_at)
                    .bind(session.created_at)
                    .execute(require_mysql(&self.pool)?)
                    .await
                    .context("Failed to create session")?;
            }
        }
        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_by_id_sqlite(require_sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_session_by_id_mysql(require_mysql(&self.pool)?, id).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM sessions WHERE id = ?")
                    .bind(id)
                    .execute(require_sqlite(&self.pool)?)
                    .await
                    .context("Failed to delete session")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM sessions WHERE id = ?")
                    .bind(id)
                    .execute(require_mysql(&self.pool)?)
                    .await
                    .context("Failed to delete session")?;
            }
        }
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(require_sqlite(&self.pool)?)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(require_mysql(&self.pool)?)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
        };
        Ok(result)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    match row {
        Some(row) => Ok(Some(Session {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })),
        None => Ok(None),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_session_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    match row {
        Some(row) => Ok(Some(Session {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup() -> SqlxSessionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ('alice', 'alice@example.com', 'x')")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        SqlxSessionRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let repo = setup().await;
        let session = repo.create(&Session::start(1, Duration::days(7))).await.unwrap();

        let fetched = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, 1);
        assert!(!fetched.is_expired());

        repo.delete(&session.id).await.unwrap();
        assert!(repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_live_sessions() {
        let repo = setup().await;
        let live = repo.create(&Session::start(1, Duration::days(1))).await.unwrap();
        let stale = repo.create(&Session::start(1, Duration::seconds(-60))).await.unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id(&live.id).await.unwrap().is_some());
        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());
    }
}
