//! HTTP error type
//!
//! Handlers return `Result<Response, AppError>`. An `AppError` becomes a
//! response carrying an `ErrorPage` extension; the `render_error_pages`
//! middleware swaps the plain body for the themed `error.html` page.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::services::{ArticleServiceError, CommentServiceError, UserServiceError};
use crate::views::ViewError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Requester may not perform the action
    #[error("Access Denied.")]
    AccessDenied,

    /// Missing entity, bad id, or a comment paired with the wrong article
    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show to the visitor
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Something went wrong on our side.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Marker left on error responses for the page renderer
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(e) => tracing::error!(error = ?e, "Request failed"),
            Self::AccessDenied => tracing::warn!("Access denied"),
            Self::NotFound(message) => tracing::debug!(%message, "Not found"),
        }

        let page = ErrorPage {
            status,
            message: self.public_message(),
        };
        let mut response = (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            page.message.clone(),
        )
            .into_response();
        response.extensions_mut().insert(page);
        response
    }
}

impl From<ArticleServiceError> for AppError {
    fn from(e: ArticleServiceError) -> Self {
        match e {
            ArticleServiceError::NotFound(id) => Self::NotFound(format!("Article {} not found.", id)),
            ArticleServiceError::InternalError(e) => Self::Internal(e),
        }
    }
}

impl From<CommentServiceError> for AppError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound { comment_id, .. } => {
                Self::NotFound(format!("Comment {} not found.", comment_id))
            }
            CommentServiceError::InternalError(e) => Self::Internal(e),
        }
    }
}

impl From<UserServiceError> for AppError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InternalError(e) => Self::Internal(e),
            other => Self::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

impl From<ViewError> for AppError {
    fn from(e: ViewError) -> Self {
        Self::Internal(anyhow::Error::new(e))
    }
}

/// Parse a path segment as an entity id. Anything else is a 404.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::not_found(format!("No route for id '{}'.", raw)))
}
