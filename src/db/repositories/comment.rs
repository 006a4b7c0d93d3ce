//! Comment repository

use crate::config::DatabaseDriver;
use crate::db::{require_mysql, require_sqlite, DynDatabasePool};
use crate::models::{Comment, CommentWithAuthor};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a comment, returning it with its id
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments on an article with their authors, oldest first
    async fn get_by_article(&self, article_id: i64) -> Result<Vec<CommentWithAuthor>>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct CommentRepositoryImpl {
    pool: DynDatabasePool,
}

impl CommentRepositoryImpl {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for CommentRepositoryImpl {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(require_sqlite(&self.pool)?, comment).await,
            DatabaseDriver::Mysql => create_mysql(require_mysql(&self.pool)?, comment).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_id_sqlite(require_sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_by_id_mysql(require_mysql(&self.pool)?, id).await,
        }
    }

    async fn get_by_article(&self, article_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_by_article_sqlite(require_sqlite(&self.pool)?, article_id).await,
            DatabaseDriver::Mysql => get_by_article_mysql(require_mysql(&self.pool)?, article_id).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(require_sqlite(&self.pool)?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(require_mysql(&self.pool)?)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

const BY_ARTICLE_SQL: &str = r#"
    SELECT c.id, c.article_id, c.user_id, c.body, c.created_at, u.username
    FROM comments c
    INNER JOIN users u ON c.user_id = u.id
    WHERE c.article_id = ?
    ORDER BY c.created_at ASC, c.id ASC
"#;

// SQLite

async fn create_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query(
        "INSERT INTO comments (article_id, user_id, body, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(comment.article_id)
    .bind(comment.user_id)
    .bind(&comment.body)
    .bind(comment.created_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    let mut created = comment.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT id, article_id, user_id, body, created_at FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    row.map(|r| row_to_comment_sqlite(&r)).transpose()
}

async fn get_by_article_sqlite(pool: &SqlitePool, article_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(BY_ARTICLE_SQL)
        .bind(article_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter()
        .map(|r| {
            Ok(CommentWithAuthor {
                comment: row_to_comment_sqlite(r)?,
                username: r.try_get("username")?,
            })
        })
        .collect()
}

fn row_to_comment_sqlite(r: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: r.try_get("id")?,
        article_id: r.try_get("article_id")?,
        user_id: r.try_get("user_id")?,
        body: r.try_get("body")?,
        created_at: r.try_get("created_at")?,
    })
}

// MySQL

async fn create_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query(
        "INSERT INTO comments (article_id, user_id, body, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(comment.article_id)
    .bind(comment.user_id)
    .bind(&comment.body)
    .bind(comment.created_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    let mut created = comment.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT id, article_id, user_id, body, created_at FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    row.map(|r| row_to_comment_mysql(&r)).transpose()
}

async fn get_by_article_mysql(pool: &MySqlPool, article_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(BY_ARTICLE_SQL)
        .bind(article_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter()
        .map(|r| {
            Ok(CommentWithAuthor {
                comment: row_to_comment_mysql(r)?,
                username: r.try_get("username")?,
            })
        })
        .collect()
}

fn row_to_comment_mysql(r: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    Ok(Comment {
        id: r.try_get("id")?,
        article_id: r.try_get("article_id")?,
        user_id: r.try_get("user_id")?,
        body: r.try_get("body")?,
        created_at: r.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> CommentRepositoryImpl {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ('alice', 'alice@example.com', 'x'), ('bob', 'bob@example.com', 'x')")
            .execute(sqlite)
            .await
            .unwrap();
        sqlx::query("INSERT INTO articles (title, content, author, published_on, category_id) VALUES ('A', 'a', 'alice', '2024-01-01', 1), ('B', 'b', 'alice', '2024-01-02', 1)")
            .execute(sqlite)
            .await
            .unwrap();
        CommentRepositoryImpl::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup().await;
        let created = repo.create(&Comment::new(2, 1, "Nice post".to_string())).await.unwrap();
        assert!(created.id > 0);

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.user_id, 2);
        assert_eq!(fetched.article_id, 1);
        assert_eq!(fetched.body, "Nice post");
    }

    #[tokio::test]
    async fn test_get_by_article_oldest_first_with_authors() {
        let repo = setup().await;
        let first = repo.create(&Comment::new(2, 1, "first".to_string())).await.unwrap();
        let second = repo.create(&Comment::new(1, 1, "second".to_string())).await.unwrap();
        repo.create(&Comment::new(2, 2, "elsewhere".to_string())).await.unwrap();

        let comments = repo.get_by_article(1).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment.id, first.id);
        assert_eq!(comments[0].username, "bob");
        assert_eq!(comments[1].comment.id, second.id);
        assert_eq!(comments[1].username, "alice");
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;
        let created = repo.create(&Comment::new(2, 1, "bye".to_string())).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(!repo.delete(created.id).await.unwrap());
    }
}
