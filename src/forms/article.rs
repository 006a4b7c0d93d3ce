//! Article create/edit form

use super::{is_blank, FormErrors, BLANK};
use crate::models::{Article, ArticleInput, Category};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const MAX_LENGTH: usize = 255;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw article form fields as posted
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ArticleForm {
    pub title: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub published_on: String,
    #[serde(rename = "_token", skip_serializing)]
    pub token: Option<String>,
}

impl ArticleForm {
    /// Prefill from a stored article, for the edit page
    pub fn from_article(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
            category: article.category_id.to_string(),
            author: article.author.clone(),
            published_on: article.published_on.format(DATE_FORMAT).to_string(),
            token: None,
        }
    }

    /// Validate against the categories offered on the form
    pub fn validate(&self, categories: &[Category]) -> Result<ArticleInput, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim();
        check_text(&mut errors, "title", title);

        if is_blank(&self.content) {
            errors.add("content", BLANK);
        }

        let author = self.author.trim();
        check_text(&mut errors, "author", author);

        let published_on = match self.published_on.trim() {
            "" => {
                errors.add("published_on", BLANK);
                None
            }
            raw => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("published_on", "Please enter a valid date.");
                    None
                }
            },
        };

        let category_id = match self.category.trim() {
            "" => {
                errors.add("category", BLANK);
                None
            }
            raw => match raw.parse::<i64>() {
                Ok(id) if categories.iter().any(|c| c.id == id) => Some(id),
                _ => {
                    errors.add("category", "Please choose a valid category.");
                    None
                }
            },
        };

        match (published_on, category_id) {
            (Some(published_on), Some(category_id)) if errors.is_empty() => Ok(ArticleInput {
                title: title.to_string(),
                content: self.content.clone(),
                author: author.to_string(),
                published_on,
                category_id,
            }),
            _ => Err(errors),
        }
    }
}

fn check_text(errors: &mut FormErrors, field: &'static str, value: &str) {
    if value.is_empty() {
        errors.add(field, BLANK);
    } else if value.chars().count() > MAX_LENGTH {
        errors.add(
            field,
            format!(
                "This value is too long. It should have {} characters or less.",
                MAX_LENGTH
            ),
        );
    }
}
