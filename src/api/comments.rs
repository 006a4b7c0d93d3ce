//! Comment deletion
//!
//! POST /article/{id}/comment/{comment_id}/delete
//!
//! Allowed for the comment's author and for admins. A request with a bad
//! CSRF token changes nothing and still redirects back to the article.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};

use crate::api::articles::TokenForm;
use crate::api::error::{parse_id, AppError};
use crate::api::middleware::{AppState, Viewer};
use crate::models::Flash;
use crate::services::csrf::delete_comment_intent;
use crate::services::{authorize, Action};

pub async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((article_id, comment_id)): Path<(String, String)>,
    Form(form): Form<TokenForm>,
) -> Result<Response, AppError> {
    let article = state.article_service.get(parse_id(&article_id)?).await?;
    let comment = state
        .comment_service
        .find_on_article(article.id, parse_id(&comment_id)?)
        .await?;

    if !authorize(viewer.user(), Action::DeleteComment(&comment)).is_allowed() {
        return Err(AppError::AccessDenied);
    }

    let back = Redirect::to(&format!("/article/{}", article.id));

    if !state.csrf_valid(&viewer, &delete_comment_intent(comment.id), form.token.as_deref()) {
        tracing::warn!(comment_id = comment.id, "Comment delete ignored: invalid CSRF token");
        return Ok(back.into_response());
    }

    if let Err(e) = state.comment_service.delete(&comment).await {
        tracing::error!(comment_id = comment.id, error = %e, "Comment delete failed");
        state.flash(&viewer, Flash::error(format!("Error while deleting: {}", e))).await;
    }
    Ok(back.into_response())
}
