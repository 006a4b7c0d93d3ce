//! Database connection pool abstraction
//!
//! A unified interface over the SQLite and MySQL backends. The concrete pool
//! is chosen from configuration at startup.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Backend-neutral handle; repositories match on `driver()` and borrow the concrete pool.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a statement that returns no rows
    async fn execute(&self, query: &str) -> Result<u64>;

    async fn ping(&self) -> Result<()>;

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// SQLite backend
pub struct SqliteDatabase {
    pool: SqlitePool,
}

/// Normalized connection URL for `url`, and whether it names an in-memory database
fn sqlite_url(url: &str) -> (String, bool) {
    if url == ":memory:" || url.starts_with("sqlite::memory:") {
        return ("sqlite::memory:".to_string(), true);
    }
    let url = match url.strip_prefix("sqlite:") {
        Some(_) if url.contains('?') => url.to_string(),
        Some(_) => format!("{}?mode=rwc", url),
        None => format!("sqlite:{}?mode=rwc", url),
    };
    (url, false)
}

impl SqliteDatabase {
    pub async fn connect(url: &str) -> Result<Self> {
        let (connection_url, in_memory) = sqlite_url(url);

        let options = if in_memory {
            // Each connection to `sqlite::memory:` is its own database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            let file = url.strip_prefix("sqlite:").unwrap_or(url);
            let file = file.split('?').next().unwrap_or(file);
            if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
            }
            SqlitePoolOptions::new().max_connections(10)
        };

        let pool = options
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        // Comments reference articles without cascade; the constraint must be enforced
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .context("Failed to enable foreign keys")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }
}

/// MySQL backend
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn connect(url: &str) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(20)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to MySQL database: {}", url))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Type alias for a shared database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Borrow the SQLite pool, failing if the driver is something else.
pub fn require_sqlite(pool: &DynDatabasePool) -> Result<&SqlitePool> {
    pool.as_sqlite()
        .ok_or_else(|| anyhow!("Expected a SQLite pool, got {:?}", pool.driver()))
}

/// Borrow the MySQL pool, failing if the driver is something else.
pub fn require_mysql(pool: &DynDatabasePool) -> Result<&MySqlPool> {
    pool.as_mysql()
        .ok_or_else(|| anyhow!("Expected a MySQL pool, got {:?}", pool.driver()))
}

/// Connect to the database named in configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let pool: DynDatabasePool = match config.driver {
        DatabaseDriver::Sqlite => Arc::new(SqliteDatabase::connect(&config.url).await?),
        DatabaseDriver::Mysql => Arc::new(MysqlDatabase::connect(&config.url).await?),
    };
    Ok(pool)
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let config = DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    };
    create_pool(&config).await
}
