//! Article repository
//!
//! Database operations for articles:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite and MySQL
//!
//! Search matches the query as a literal substring of the title or the
//! content. `LIKE` wildcards in the query are escaped, and case sensitivity
//! follows the column collation.

use crate::config::DatabaseDriver;
use crate::db::{require_mysql, require_sqlite, DynDatabasePool};
use crate::models::Article;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert a new article, returning it with its assigned id
    async fn create(&self, article: &Article) -> Result<Article>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Persist the editable fields of an existing article
    async fn update(&self, article: &Article) -> Result<Article>;

    /// Delete an article and every comment on it in one transaction.
    /// Returns whether an article row was removed.
    async fn delete_with_comments(&self, id: i64) -> Result<bool>;

    /// All articles in storage order
    async fn list_all(&self) -> Result<Vec<Article>>;

    /// Articles whose title or content contains `query`, newest publication first
    async fn search(&self, query: &str) -> Result<Vec<Article>>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_article_sqlite(require_sqlite(&self.pool)?, article).await,
            DatabaseDriver::Mysql => create_article_mysql(require_mysql(&self.pool)?, article).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_article_by_id_sqlite(require_sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_article_by_id_mysql(require_mysql(&self.pool)?, id).await,
        }
    }

    async fn update(&self, article: &Article) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_article_sqlite(require_sqlite(&self.pool)?, article).await,
            DatabaseDriver::Mysql => update_article_mysql(require_mysql(&self.pool)?, article).await,
        }
    }

    async fn delete_with_comments(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_article_sqlite(require_sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => delete_article_mysql(require_mysql(&self.pool)?, id).await,
        }
    }

    async fn list_all(&self) -> Result<Vec<Article>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_articles_sqlite(require_sqlite(&self.pool)?).await,
            DatabaseDriver::Mysql => list_articles_mysql(require_mysql(&self.pool)?).await,
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<Article>> {
        let pattern = like_pattern(query);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => search_articles_sqlite(require_sqlite(&self.pool)?, &pattern).await,
            DatabaseDriver::Mysql => search_articles_mysql(require_mysql(&self.pool)?, &pattern).await,
        }
    }
}

/// Build a `%query%` pattern with `\`, `%` and `_` escaped by a backslash.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

const ARTICLE_COLUMNS: &str =
    "id, title, content, author, published_on, category_id, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(pool: &SqlitePool, article: &Article) -> Result<Article> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, content, author, published_on, category_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.author)
    .bind(article.published_on)
    .bind(article.category_id)
    .bind(article.created_at)
    .bind(article.updated_at)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    let mut created = article.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_article_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(&format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by ID")?;

    row.as_ref().map(row_to_article_sqlite).transpose()
}

async fn update_article_sqlite(pool: &SqlitePool, article: &Article) -> Result<Article> {
    sqlx::query(
        r#"
        UPDATE articles
        SET title = ?, content = ?, author = ?, published_on = ?, category_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.author)
    .bind(article.published_on)
    .bind(article.category_id)
    .bind(article.updated_at)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    Ok(article.clone())
}

async fn delete_article_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM comments WHERE article_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete article comments")?;

    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete article")?;

    tx.commit().await.context("Failed to commit article deletion")?;

    Ok(result.rows_affected() > 0)
}

async fn list_articles_sqlite(pool: &SqlitePool) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!("SELECT {} FROM articles ORDER BY id ASC", ARTICLE_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

async fn search_articles_sqlite(pool: &SqlitePool, pattern: &str) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM articles
        WHERE title LIKE ? ESCAPE '\' OR content LIKE ? ESCAPE '\'
        ORDER BY published_on DESC, id DESC
        "#,
        ARTICLE_COLUMNS
    ))
    .bind(pattern)
    .bind(pattern)
    .fetch_all(pool)
    .await
    .context("Failed to search articles")?;

    rows.iter().map(row_to_article_sqlite).collect()
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        author: row.try_get("author")?,
        published_on: row.try_get("published_on")?,
        category_id: row.try_get("category_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(pool: &MySqlPool, article: &Article) -> Result<Article> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, content, author, published_on, category_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.author)
    .bind(article.published_on)
    .bind(article.category_id)
    .bind(article.created_at)
    .bind(article.updated_at)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    let mut created = article.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn get_article_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Article>> {
    let row = sqlx::query(&format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get article by ID")?;

    row.as_ref().map(row_to_article_mysql).transpose()
}

async fn update_article_mysql(pool: &MySqlPool, article: &Article) -> Result<Article> {
    sqlx::query(
        r#"
        UPDATE articles
        SET title = ?, content = ?, author = ?, published_on = ?, category_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.author)
    .bind(article.published_on)
    .bind(article.category_id)
    .bind(article.updated_at)
    .bind(article.id)
    .execute(pool)
    .await
    .context("Failed to update article")?;

    Ok(article.clone())
}

async fn delete_article_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM comments WHERE article_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete article comments")?;

    let result = sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete article")?;

    tx.commit().await.context("Failed to commit article deletion")?;

    Ok(result.rows_affected() > 0)
}

async fn list_articles_mysql(pool: &MySqlPool) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!("SELECT {} FROM articles ORDER BY id ASC", ARTICLE_COLUMNS))
        .fetch_all(pool)
        .await
        .context("Failed to list articles")?;

    rows.iter().map(row_to_article_mysql).collect()
}

// Backslash is MySQL's default LIKE escape character.
async fn search_articles_mysql(pool: &MySqlPool, pattern: &str) -> Result<Vec<Article>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM articles
        WHERE title LIKE ? OR content LIKE ?
        ORDER BY published_on DESC, id DESC
        "#,
        ARTICLE_COLUMNS
    ))
    .bind(pattern)
    .bind(pattern)
    .fetch_all(pool)
    .await
    .context("Failed to search articles")?;

    rows.iter().map(row_to_article_mysql).collect()
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        author: row.try_get("author")?,
        published_on: row.try_get("published_on")?,
        category_id: row.try_get("category_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
