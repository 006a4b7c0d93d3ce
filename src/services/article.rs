//! Article service
//!
//! Business logic for articles:
//! - listing, with an optional substring search
//! - create and edit from validated form input
//! - delete together with the article's comments

use crate::db::repositories::{ArticleRepository, CategoryRepository};
use crate::models::{Article, ArticleInput, Category};
use anyhow::Context;
use std::sync::Arc;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// Article not found
    #[error("Article not found: {0}")]
    NotFound(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Article service for managing blog articles
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    category_repo: Arc<dyn CategoryRepository>,
}

impl ArticleService {
    pub fn new(repo: Arc<dyn ArticleRepository>, category_repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo, category_repo }
    }

    /// List articles.
    ///
    /// A non-empty `query` returns only articles whose title or content
    /// contains it, newest publication date first. Without one every article
    /// is returned in storage order.
    pub async fn list(&self, query: Option<&str>) -> Result<Vec<Article>, ArticleServiceError> {
        let articles = match query.filter(|q| !q.is_empty()) {
            Some(q) => self.repo.search(q).await.context("Failed to search articles")?,
            None => self.repo.list_all().await.context("Failed to list articles")?,
        };
        Ok(articles)
    }

    /// Get an article, or `NotFound`
    pub async fn get(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or(ArticleServiceError::NotFound(id))
    }

    /// Categories an article may be filed under
    pub async fn categories(&self) -> Result<Vec<Category>, ArticleServiceError> {
        let categories = self
            .category_repo
            .list()
            .await
            .context("Failed to list categories")?;
        Ok(categories)
    }

    /// Persist a new article
    pub async fn create(&self, input: ArticleInput) -> Result<Article, ArticleServiceError> {
        let article = self
            .repo
            .create(&Article::new(input))
            .await
            .context("Failed to create article")?;

        tracing::info!(article_id = article.id, title = %article.title, "Article created");
        Ok(article)
    }

    /// Overwrite an existing article's fields
    pub async fn update(
        &self,
        mut article: Article,
        input: ArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        article.apply(input);
        let updated = self
            .repo
            .update(&article)
            .await
            .context("Failed to update article")?;

        tracing::info!(article_id = updated.id, "Article updated");
        Ok(updated)
    }

    /// Delete an article and its comments atomically
    pub async fn delete(&self, id: i64) -> Result<(), ArticleServiceError> {
        let removed = self
            .repo
            .delete_with_comments(id)
            .await
            .context("Failed to delete article")?;

        if !removed {
            return Err(ArticleServiceError::NotFound(id));
        }
        tracing::info!(article_id = id, "Article deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxArticleRepository, SqlxCategoryRepository};
    use crate::db::{create_test_pool, migrations};
    use chrono::NaiveDate;

    async fn service() -> ArticleService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        ArticleService::new(
            SqlxArticleRepository::boxed(pool.clone()),
            SqlxCategoryRepository::boxed(pool),
        )
    }

    fn input(title: &str, day: u32) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            content: "body".to_string(),
            author: "Alice".to_string(),
            published_on: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            category_id: 1,
        }
    }

    #[tokio::test]
    async fn test_empty_query_lists_everything() {
        let service = service().await;
        service.create(input("First", 2)).await.unwrap();
        service.create(input("Second", 1)).await.unwrap();

        let all = service.list(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "First");

        assert_eq!(service.list(Some("")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_query_filters_and_orders() {
        let service = service().await;
        service.create(input("Hello old", 1)).await.unwrap();
        service.create(input("Unrelated", 3)).await.unwrap();
        service.create(input("Hello new", 5)).await.unwrap();

        let titles: Vec<String> = service
            .list(Some("Hello"))
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Hello new", "Hello old"]);
    }

    #[tokio::test]
    async fn test_update_changes_fields() {
        let service = service().await;
        let article = service.create(input("Draft", 1)).await.unwrap();

        let updated = service.update(article.clone(), input("Final", 9)).await.unwrap();
        assert_eq!(updated.id, article.id);

        let fetched = service.get(article.id).await.unwrap();
        assert_eq!(fetched.title, "Final");
        assert_eq!(fetched.published_on, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert!(fetched.updated_at >= article.updated_at);
    }

    #[tokio::test]
    async fn test_get_and_delete_missing() {
        let service = service().await;
        assert!(matches!(service.get(7).await, Err(ArticleServiceError::NotFound(7))));
        assert!(matches!(service.delete(7).await, Err(ArticleServiceError::NotFound(7))));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = service().await;
        let article = service.create(input("Doomed", 1)).await.unwrap();
        service.delete(article.id).await.unwrap();
        assert!(service.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_categories_seeded() {
        let service = service().await;
        let categories = service.categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "General");
    }
}
