//! Category repository
//!
//! Categories are seeded by migrations; articles choose from this list.

use crate::config::DatabaseDriver;
use crate::db::{require_mysql, require_sqlite, DynDatabasePool};
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, name: &str) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// List all categories by name
    async fn list(&self) -> Result<Vec<Category>>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, name: &str) -> Result<Category> {
        let now = Utc::now();
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("INSERT INTO categories (name, created_at) VALUES (?, ?)")
                .bind(name)
                .bind(now)
                .execute(require_sqlite(&self.pool)?)
                .await
                .context("Failed to create category")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query("INSERT INTO categories (name, created_at) VALUES (?, ?)")
                .bind(name)
                .bind(now)
                .execute(require_mysql(&self.pool)?)
                .await
                .context("Failed to create category")?
                .last_insert_id() as i64,
        };

        Ok(Category {
            id,
            name: name.to_string(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        let sql = "SELECT id, name, created_at FROM categories WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(require_sqlite(&self.pool)?)
                    .await
                    .context("Failed to get category by ID")?;
                match row {
                    Some(row) => Ok(Some(Category {
                        id: row.try_get("id")?,
                        name: row.try_get("name")?,
                        created_at: row.try_get("created_at")?,
                    })),
                    None => Ok(None),
                }
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(require_mysql(&self.pool)?)
                    .await
                    .context("Failed to get category by ID")?;
                match row {
                    Some(row) => Ok(Some(Category {
                        id: row.try_get("id")?,
                        name: row.try_get("name")?,
                        created_at: row.try_get("created_at")?,
                    })),
                    None => Ok(None),
                }
            }
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let sql = "SELECT id, name, created_at FROM categories ORDER BY name ASC";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .fetch_all(require_sqlite(&self.pool)?)
                    .await
                    .context("Failed to list categories")?;
                rows.iter()
                    .map(|row| {
                        Ok(Category {
                            id: row.try_get("id")?,
                            name: row.try_get("name")?,
                            created_at: row.try_get("created_at")?,
                        })
                    })
                    .collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .fetch_all(require_mysql(&self.pool)?)
                    .await
                    .context("Failed to list categories")?;
                rows.iter()
                    .map(|row| {
                        Ok(Category {
                            id: row.try_get("id")?,
                            name: row.try_get("name")?,
                            created_at: row.try_get("created_at")?,
                        })
                    })
                    .collect()
            }
        }
    }
}
