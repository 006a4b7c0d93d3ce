//! Shared state, session resolution and page rendering
//!
//! - `AppState` holds the services every handler needs
//! - `resolve_session` turns the `session` cookie into a `Viewer`
//! - `render_error_pages` renders `AppError` responses as HTML

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::api::error::{AppError, ErrorPage};
use crate::config::Config;
use crate::db::repositories::{
    CommentRepositoryImpl, SqlxArticleRepository, SqlxCategoryRepository, SqlxFlashRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Flash, User};
use crate::services::csrf::LOGOUT_INTENT;
use crate::services::{ArticleService, CommentService, CsrfTokenManager, FlashService, UserService};
use crate::views::Views;

pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub article_service: Arc<ArticleService>,
    pub comment_service: Arc<CommentService>,
    pub flash_service: Arc<FlashService>,
    pub csrf: Arc<CsrfTokenManager>,
    pub views: Arc<Views>,
    pub session_days: i64,
    pub secure_cookies: bool,
}

impl AppState {
    /// Wire repositories, services and templates for `pool`
    pub fn new(pool: DynDatabasePool, config: &Config) -> anyhow::Result<Self> {
        let csrf = match &config.security.csrf_secret {
            Some(secret) => CsrfTokenManager::new(secret.as_bytes())?,
            None => {
                tracing::warn!("No csrf_secret configured; generated a random one, tokens will not survive a restart");
                CsrfTokenManager::random()?
            }
        };

        let views = Views::load(config.templates.path.as_deref())?;

        Ok(Self {
            user_service: Arc::new(UserService::with_session_expiration(
                SqlxUserRepository::boxed(pool.clone()),
                SqlxSessionRepository::boxed(pool.clone()),
                config.security.session_days,
            )),
            article_service: Arc::new(ArticleService::new(
                SqlxArticleRepository::boxed(pool.clone()),
                SqlxCategoryRepository::boxed(pool.clone()),
            )),
            comment_service: Arc::new(CommentService::new(CommentRepositoryImpl::boxed(pool.clone()))),
            flash_service: Arc::new(FlashService::new(SqlxFlashRepository::boxed(pool.clone()))),
            csrf: Arc::new(csrf),
            views: Arc::new(views),
            session_days: config.security.session_days,
            secure_cookies: config.security.secure_cookies,
            pool,
        })
    }

    /// Render a full page: adds the viewer, pending flashes and the logout token
    pub async fn render(
        &self,
        viewer: &Viewer,
        template: &str,
        mut context: TeraContext,
    ) -> Result<Response, AppError> {
        let flashes = self.flash_service.take(viewer.session_id()).await?;
        self.insert_layout_vars(viewer, &flashes, &mut context);
        let html = self.views.render(template, &context)?;
        Ok(Html(html).into_response())
    }

    /// Queue a notice; a failure here is logged, never surfaced
    pub async fn flash(&self, viewer: &Viewer, flash: Flash) {
        if let Err(e) = self.flash_service.push(viewer.session_id(), flash).await {
            tracing::error!(error = ?e, "Failed to queue flash notice");
        }
    }

    /// CSRF token for `intent`, bound to the viewer's session
    pub fn csrf_token(&self, viewer: &Viewer, intent: &str) -> String {
        self.csrf.token(viewer.csrf_session(), intent)
    }

    /// Check a submitted token for `intent` against the viewer's session
    pub fn csrf_valid(&self, viewer: &Viewer, intent: &str, token: Option<&str>) -> bool {
        self.csrf.is_valid(viewer.csrf_session(), intent, token)
    }

    fn insert_layout_vars(&self, viewer: &Viewer, flashes: &[Flash], context: &mut TeraContext) {
        context.insert("current_user", &viewer.user);
        context.insert("is_admin", &viewer.is_admin());
        context.insert("flashes", flashes);
        context.insert("logout_token", &self.csrf_token(viewer, LOGOUT_INTENT));
    }

    /// `Set-Cookie` value for a fresh session
    pub fn session_cookie(&self, session_id: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            SESSION_COOKIE,
            session_id,
            self.session_days * 24 * 60 * 60,
            if self.secure_cookies { "; Secure" } else { "" }
        )
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn clear_session_cookie(&self) -> String {
        format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            SESSION_COOKIE,
            if self.secure_cookies { "; Secure" } else { "" }
        )
    }
}

/// Whoever is making the request
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<User>,
    session_id: Option<String>,
}

impl Viewer {
    pub fn authenticated(user: User, session_id: String) -> Self {
        Self {
            user: Some(user),
            session_id: Some(session_id),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Session id that CSRF tokens bind to; empty for anonymous visitors
    pub fn csrf_session(&self) -> &str {
        self.session_id.as_deref().unwrap_or("")
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// Extract the session token from the `Cookie` header
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_str
        .split(';')
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Resolve the session cookie to a `Viewer` for every request.
///
/// Unknown or expired sessions and lookup failures leave the request anonymous.
pub async fn resolve_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut viewer = Viewer::default();

    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some((session, user))) => viewer = Viewer::authenticated(user, session.id),
            Ok(None) => tracing::debug!("Ignoring unknown or expired session"),
            Err(e) => tracing::error!(error = %e, "Session validation failed"),
        }
    }

    request.extensions_mut().insert(viewer);
    next.run(request).await
}

/// Replace the plain body of error responses with the rendered error page
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let viewer = request.extensions().get::<Viewer>().cloned().unwrap_or_default();
    let response = next.run(request).await;

    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let mut context = TeraContext::new();
    context.insert("status", &page.status.as_u16());
    context.insert("message", &page.message);
    state.insert_layout_vars(&viewer, &[], &mut context);

    match state.views.render("error.html", &context) {
        Ok(html) => (page.status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render error page");
            response
        }
    }
}

/// Build a `Set-Cookie` header map
pub fn cookie_headers(cookie: &str) -> Result<HeaderMap, AppError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid cookie header: {}", e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}
