//! Article model
//!
//! - `Article` entity as stored
//! - `ArticleInput`, the validated field set produced by the article form

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Article entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// Article title
    pub title: String,
    /// Body text
    pub content: String,
    /// Free-text author byline
    pub author: String,
    /// Publication date shown to readers and used for search ordering
    pub published_on: NaiveDate,
    /// Category ID
    pub category_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Article {
    /// Build an unsaved article from validated input
    pub fn new(input: ArticleInput) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by database
            title: input.title,
            content: input.content,
            author: input.author,
            published_on: input.published_on,
            category_id: input.category_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the editable fields with validated input
    pub fn apply(&mut self, input: ArticleInput) {
        self.title = input.title;
        self.content = input.content;
        self.author = input.author;
        self.published_on = input.published_on;
        self.category_id = input.category_id;
        self.updated_at = Utc::now();
    }
}

/// Validated article fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
    pub author: String,
    pub published_on: NaiveDate,
    pub category_id: i64,
}

impl From<&Article> for ArticleInput {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
            author: article.author.clone(),
            published_on: article.published_on,
            category_id: article.category_id,
        }
    }
}
