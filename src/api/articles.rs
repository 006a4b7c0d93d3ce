//! Article pages
//!
//! - GET /article - list, or search with `q`
//! - GET/POST /article/new - create (admin)
//! - GET/POST /article/{id} - show, and submit a comment
//! - GET/POST /article/{id}/edit - edit (admin)
//! - POST /article/{id}/delete - delete with its comments (admin)
//!
//! Handlers that take an id look the article up first, so a missing article
//! is a 404 even for requesters who would also be denied.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::error::{parse_id, AppError};
use crate::api::middleware::{AppState, Viewer};
use crate::forms::{require_csrf, ArticleForm, CommentForm, FormErrors};
use crate::models::{Article, Category, CommentWithAuthor, Flash};
use crate::services::csrf::{
    delete_article_intent, delete_comment_intent, ARTICLE_FORM_INTENT, COMMENT_FORM_INTENT,
};
use crate::services::{authorize, Action};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

/// Form body carrying only a CSRF token
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenForm {
    #[serde(rename = "_token")]
    pub token: Option<String>,
}

#[derive(Serialize)]
struct ArticleRow<'a> {
    article: &'a Article,
    category: &'a str,
    delete_token: Option<String>,
}

#[derive(Serialize)]
struct CommentRow {
    #[serde(flatten)]
    entry: CommentWithAuthor,
    delete_token: Option<String>,
}

fn category_name<'a>(categories: &'a [Category], id: i64) -> &'a str {
    categories
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.as_str())
        .unwrap_or("")
}

fn require(viewer: &Viewer, action: Action<'_>) -> Result<(), AppError> {
    if authorize(viewer.user(), action).is_allowed() {
        Ok(())
    } else {
        Err(AppError::AccessDenied)
    }
}

/// GET /article
pub async fn index(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let q = query.q.unwrap_or_default();
    let articles = state.article_service.list(Some(&q)).await?;
    let categories = state.article_service.categories().await?;

    let rows: Vec<ArticleRow> = articles
        .iter()
        .map(|article| ArticleRow {
            article,
            category: category_name(&categories, article.category_id),
            delete_token: viewer
                .is_admin()
                .then(|| state.csrf_token(&viewer, &delete_article_intent(article.id))),
        })
        .collect();

    let mut context = TeraContext::new();
    context.insert("rows", &rows);
    context.insert("q", &q);
    state.render(&viewer, "article/index.html", context).await
}

async fn render_form(
    state: &AppState,
    viewer: &Viewer,
    template: &str,
    article: Option<&Article>,
    form: &ArticleForm,
    errors: &FormErrors,
    categories: &[Category],
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("categories", categories);
    context.insert("form_token", &state.csrf_token(viewer, ARTICLE_FORM_INTENT));
    match article {
        Some(article) => {
            context.insert("article", article);
            context.insert("action", &format!("/article/{}/edit", article.id));
            context.insert("submit_label", "Update");
        }
        None => {
            context.insert("action", "/article/new");
            context.insert("submit_label", "Save");
        }
    }
    state.render(viewer, template, context).await
}

/// GET /article/new
pub async fn new_form(State(state): State<AppState>, viewer: Viewer) -> Result<Response, AppError> {
    require(&viewer, Action::CreateArticle)?;

    let categories = state.article_service.categories().await?;
    render_form(
        &state,
        &viewer,
        "article/new.html",
        None,
        &ArticleForm::default(),
        &FormErrors::default(),
        &categories,
    )
    .await
}

/// POST /article/new
pub async fn create(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<ArticleForm>,
) -> Result<Response, AppError> {
    require(&viewer, Action::CreateArticle)?;

    let categories = state.article_service.categories().await?;
    let token_valid = state.csrf_valid(&viewer, ARTICLE_FORM_INTENT, form.token.as_deref());

    match require_csrf(form.validate(&categories), token_valid) {
        Ok(input) => {
            state.article_service.create(input).await?;
            state.flash(&viewer, Flash::success("The article was created successfully.")).await;
            Ok(Redirect::to("/article").into_response())
        }
        Err(errors) => {
            tracing::debug!(?errors, "Article form rejected");
            render_form(&state, &viewer, "article/new.html", None, &form, &errors, &categories).await
        }
    }
}

async fn render_show(
    state: &AppState,
    viewer: &Viewer,
    article: &Article,
    form: &CommentForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let categories = state.article_service.categories().await?;
    let comments: Vec<CommentRow> = state
        .comment_service
        .for_article(article.id)
        .await?
        .into_iter()
        .map(|entry| {
            let may_delete = authorize(viewer.user(), Action::DeleteComment(&entry.comment)).is_allowed();
            CommentRow {
                delete_token: may_delete
                    .then(|| state.csrf_token(viewer, &delete_comment_intent(entry.comment.id))),
                entry,
            }
        })
        .collect();

    let mut context = TeraContext::new();
    context.insert("article", article);
    context.insert("category", category_name(&categories, article.category_id));
    context.insert("comments", &comments);
    context.insert("can_comment", &authorize(viewer.user(), Action::CreateComment).is_allowed());
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("comment_token", &state.csrf_token(viewer, COMMENT_FORM_INTENT));
    context.insert(
        "delete_token",
        &viewer
            .is_admin()
            .then(|| state.csrf_token(viewer, &delete_article_intent(article.id))),
    );
    state.render(viewer, "article/show.html", context).await
}

/// GET /article/{id}
pub async fn show(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let article = state.article_service.get(parse_id(&id)?).await?;
    render_show(&state, &viewer, &article, &CommentForm::default(), &FormErrors::default()).await
}

/// POST /article/{id}: submit a comment.
///
/// Anonymous submissions are ignored and the page is rendered as for a GET.
pub async fn comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let article = state.article_service.get(parse_id(&id)?).await?;

    let user = match viewer.user() {
        Some(user) if authorize(Some(user), Action::CreateComment).is_allowed() => user,
        _ => {
            return render_show(&state, &viewer, &article, &CommentForm::default(), &FormErrors::default())
                .await
        }
    };

    let token_valid = state.csrf_valid(&viewer, COMMENT_FORM_INTENT, form.token.as_deref());
    match require_csrf(form.validate(), token_valid) {
        Ok(body) => {
            state.comment_service.create(user.id, article.id, body).await?;
            Ok(Redirect::to(&format!("/article/{}", article.id)).into_response())
        }
        Err(errors) => render_show(&state, &viewer, &article, &form, &errors).await,
    }
}

/// GET /article/{id}/edit
pub async fn edit_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let article = state.article_service.get(parse_id(&id)?).await?;
    require(&viewer, Action::EditArticle)?;

    let categories = state.article_service.categories().await?;
    render_form(
        &state,
        &viewer,
        "article/edit.html",
        Some(&article),
        &ArticleForm::from_article(&article),
        &FormErrors::default(),
        &categories,
    )
    .await
}

/// POST /article/{id}/edit
pub async fn update(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(form): Form<ArticleForm>,
) -> Result<Response, AppError> {
    let article = state.article_service.get(parse_id(&id)?).await?;
    require(&viewer, Action::EditArticle)?;

    let categories = state.article_service.categories().await?;
    let token_valid = state.csrf_valid(&viewer, ARTICLE_FORM_INTENT, form.token.as_deref());

    match require_csrf(form.validate(&categories), token_valid) {
        Ok(input) => {
            state.article_service.update(article, input).await?;
            state.flash(&viewer, Flash::success("The article was updated successfully.")).await;
            Ok(Redirect::to("/article").into_response())
        }
        Err(errors) => {
            render_form(&state, &viewer, "article/edit.html", Some(&article), &form, &errors, &categories)
                .await
        }
    }
}

/// POST /article/{id}/delete
///
/// Always redirects to the list. The outcome, including a bad token or a
/// failed delete, is reported as a flash notice.
pub async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(form): Form<TokenForm>,
) -> Result<Response, AppError> {
    let article = state.article_service.get(parse_id(&id)?).await?;
    require(&viewer, Action::DeleteArticle)?;

    let intent = delete_article_intent(article.id);
    if !state.csrf_valid(&viewer, &intent, form.token.as_deref()) {
        tracing::warn!(article_id = article.id, "Article delete rejected: invalid CSRF token");
        state.flash(&viewer, Flash::error("Invalid CSRF token.")).await;
        return Ok(Redirect::to("/article").into_response());
    }

    tracing::debug!(article_id = article.id, "Deleting article");
    match state.article_service.delete(article.id).await {
        Ok(()) => {
            state.flash(&viewer, Flash::success("The article was deleted successfully.")).await;
        }
        Err(e) => {
            tracing::error!(article_id = article.id, error = %e, "Article delete failed");
            state.flash(&viewer, Flash::error(format!("Error while deleting: {}", e))).await;
        }
    }
    Ok(Redirect::to("/article").into_response())
}
