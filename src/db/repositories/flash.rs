//! Flash repository
//!
//! Notices are queued per login session and removed when read.

use crate::config::DatabaseDriver;
use crate::db::{require_mysql, require_sqlite, DynDatabasePool};
use crate::models::{Flash, FlashLevel};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait FlashRepository: Send + Sync {
    /// Queue a notice for the session
    async fn push(&self, session_id: &str, flash: &Flash) -> Result<()>;

    /// Remove and return every queued notice, in the order they were queued
    async fn take(&self, session_id: &str) -> Result<Vec<Flash>>;
}

pub struct SqlxFlashRepository {
    pool: DynDatabasePool,
}

impl SqlxFlashRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FlashRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FlashRepository for SqlxFlashRepository {
    async fn push(&self, session_id: &str, flash: &Flash) -> Result<()> {
        let sql = "INSERT INTO flashes (session_id, level, message, created_at) VALUES (?, ?, ?, ?)";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(session_id)
                    .bind(flash.level.to_string())
                    .bind(&flash.message)
                    .bind(Utc::now())
                    .execute(require_sqlite(&self.pool)?)
                    .await
                    .context("Failed to queue flash")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(session_id)
                    .bind(flash.level.to_string())
                    .bind(&flash.message)
                    .bind(Utc::now())
                    .execute(require_mysql(&self.pool)?)
                    .await
                    .context("Failed to queue flash")?;
            }
        }
        Ok(())
    }

    async fn take(&self, session_id: &str) -> Result<Vec<Flash>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => take_sqlite(require_sqlite(&self.pool)?, session_id).await,
            DatabaseDriver::Mysql => take_mysql(require_mysql(&self.pool)?, session_id).await,
        }
    }
}

const SELECT_SQL: &str = "SELECT level, message FROM flashes WHERE session_id = ? ORDER BY id ASC";
const DELETE_SQL: &str = "DELETE FROM flashes WHERE session_id = ?";

async fn take_sqlite(pool: &SqlitePool, session_id: &str) -> Result<Vec<Flash>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query(SELECT_SQL)
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to read flashes")?;

    if !rows.is_empty() {
        sqlx::query(DELETE_SQL)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear flashes")?;
    }
    tx.commit().await.context("Failed to commit flash read")?;

    rows.iter()
        .map(|row| {
            let level: String = row.try_get("level")?;
            Ok(Flash {
                level: FlashLevel::from_str(&level).map_err(|e| anyhow!(e))?,
                message: row.try_get("message")?,
            })
        })
        .collect()
}

async fn take_mysql(pool: &MySqlPool, session_id: &str) -> Result<Vec<Flash>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query(SELECT_SQL)
        .bind(session_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to read flashes")?;

    if !rows.is_empty() {
        sqlx::query(DELETE_SQL)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear flashes")?;
    }
    tx.commit().await.context("Failed to commit flash read")?;

    rows.iter()
        .map(|row| {
            let level: String = row.try_get("level")?;
            Ok(Flash {
                level: FlashLevel::from_str(&level).map_err(|e| anyhow!(e))?,
                message: row.try_get("message")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxFlashRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ('alice', 'alice@example.com', 'x')")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ('s1', 1, '2999-01-01 00:00:00'), ('s2', 1, '2999-01-01 00:00:00')")
            .execute(sqlite)
            .await
            .unwrap();
        SqlxFlashRepository::new(pool)
    }

    #[tokio::test]
    async fn test_take_returns_in_order_then_empties() {
        let repo = setup().await;
        repo.push("s1", &Flash::success("saved")).await.unwrap();
        repo.push("s1", &Flash::error("oops")).await.unwrap();
        repo.push("s2", &Flash::info("other session")).await.unwrap();

        let flashes = repo.take("s1").await.unwrap();
        assert_eq!(flashes, vec![Flash::success("saved"), Flash::error("oops")]);
        assert!(repo.take("s1").await.unwrap().is_empty());

        assert_eq!(repo.take("s2").await.unwrap().len(), 1);
    }
}
