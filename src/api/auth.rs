//! Login, registration and logout pages
//!
//! - GET/POST /login
//! - GET/POST /register (the first account becomes admin)
//! - POST /logout

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::articles::TokenForm;
use crate::api::error::AppError;
use crate::api::middleware::{cookie_headers, AppState, Viewer};
use crate::services::csrf::LOGOUT_INTENT;
use crate::services::{LoginInput, RegisterInput, UserServiceError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

async fn render_login(
    state: &AppState,
    viewer: &Viewer,
    username: &str,
    error: Option<String>,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("username", username);
    context.insert("error", &error);
    state.render(viewer, "security/login.html", context).await
}

async fn render_register(
    state: &AppState,
    viewer: &Viewer,
    form: &RegisterForm,
    error: Option<String>,
) -> Result<Response, AppError> {
    let mut context = TeraContext::new();
    context.insert("username", &form.username);
    context.insert("email", &form.email);
    context.insert("error", &error);
    state.render(viewer, "security/register.html", context).await
}

/// GET /login
pub async fn login_form(State(state): State<AppState>, viewer: Viewer) -> Result<Response, AppError> {
    render_login(&state, &viewer, "", None).await
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let result = state
        .user_service
        .login(LoginInput {
            username: form.username.clone(),
            password: form.password,
        })
        .await;

    match result {
        Ok(session) => {
            let headers = cookie_headers(&state.session_cookie(&session.id))?;
            Ok((headers, Redirect::to("/article")).into_response())
        }
        Err(UserServiceError::AuthenticationError(message)) => {
            render_login(&state, &viewer, &form.username, Some(message)).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /register
pub async fn register_form(State(state): State<AppState>, viewer: Viewer) -> Result<Response, AppError> {
    render_register(&state, &viewer, &RegisterForm::default(), None).await
}

/// POST /register: create the account and sign it in
pub async fn register(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let result = state
        .user_service
        .register(RegisterInput {
            username: form.username.clone(),
            email: form.email.clone(),
            password: form.password.clone(),
        })
        .await;

    let user = match result {
        Ok(user) => user,
        Err(UserServiceError::ValidationError(message)) | Err(UserServiceError::UserExists(message)) => {
            return render_register(&state, &viewer, &form, Some(message)).await;
        }
        Err(e) => return Err(e.into()),
    };

    let session = state.user_service.create_session(user.id).await?;
    let headers = cookie_headers(&state.session_cookie(&session.id))?;
    Ok((headers, Redirect::to("/article")).into_response())
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<TokenForm>,
) -> Result<Response, AppError> {
    let Some(session_id) = viewer.session_id() else {
        return Ok(Redirect::to("/article").into_response());
    };

    if !state.csrf_valid(&viewer, LOGOUT_INTENT, form.token.as_deref()) {
        tracing::warn!("Logout ignored: invalid CSRF token");
        return Ok(Redirect::to("/article").into_response());
    }

    state.user_service.logout(session_id).await?;
    let headers = cookie_headers(&state.clear_session_cookie())?;
    Ok((headers, Redirect::to("/article")).into_response())
}
