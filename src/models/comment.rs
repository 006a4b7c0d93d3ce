//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
///
/// The article and the author are fixed when the comment is constructed;
/// there is no way to re-point an existing comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub user_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Create an unsaved comment by `user_id` on `article_id`, stamped now
    pub fn new(user_id: i64, article_id: i64, body: String) -> Self {
        Self {
            id: 0,
            article_id,
            user_id,
            body,
            created_at: Utc::now(),
        }
    }

    /// Whether this comment hangs off the given article
    pub fn belongs_to(&self, article_id: i64) -> bool {
        self.article_id == article_id
    }
}

/// Comment joined with its author's username, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub username: String,
}
