//! Comment service

use crate::db::repositories::CommentRepository;
use crate::models::{Comment, CommentWithAuthor};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// No comment with this id on this article
    #[error("Comment {comment_id} not found on article {article_id}")]
    NotFound { article_id: i64, comment_id: i64 },

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>) -> Self {
        Self { repo }
    }

    /// Comments on an article, oldest first
    pub async fn for_article(&self, article_id: i64) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        let comments = self
            .repo
            .get_by_article(article_id)
            .await
            .context("Failed to load comments")?;
        Ok(comments)
    }

    /// Store a comment by `user_id` on `article_id`
    pub async fn create(&self, user_id: i64, article_id: i64, body: String) -> Result<Comment, CommentServiceError> {
        let comment = self
            .repo
            .create(&Comment::new(user_id, article_id, body))
            .await
            .context("Failed to create comment")?;

        tracing::info!(comment_id = comment.id, article_id, user_id, "Comment created");
        Ok(comment)
    }

    /// Look up a comment that must belong to `article_id`.
    ///
    /// A comment attached to a different article is reported as not found.
    pub async fn find_on_article(&self, article_id: i64, comment_id: i64) -> Result<Comment, CommentServiceError> {
        let comment = self
            .repo
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?;

        match comment {
            Some(comment) if comment.belongs_to(article_id) => Ok(comment),
            _ => Err(CommentServiceError::NotFound { article_id, comment_id }),
        }
    }

    pub async fn delete(&self, comment: &Comment) -> Result<(), CommentServiceError> {
        self.repo
            .delete(comment.id)
            .await
            .context("Failed to delete comment")?;

        tracing::info!(comment_id = comment.id, article_id = comment.article_id, "Comment deleted");
        Ok(())
    }
}
