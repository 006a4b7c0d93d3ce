//! HTTP layer - handlers and routing
//!
//! Server-rendered HTML pages:
//! - Article list, search, create, show, edit, delete
//! - Comment submission (on the article page) and deletion
//! - Login, registration, logout

pub mod articles;
pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    response::Redirect,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use middleware::{AppState, Viewer};

async fn not_found() -> AppError {
    AppError::not_found("Page not found.")
}

/// Build the page routes
pub fn build_page_router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/article") }))
        .route("/article", get(articles::index))
        .route("/article/new", get(articles::new_form).post(articles::create))
        .route("/article/{id}", get(articles::show).post(articles::comment))
        .route("/article/{id}/edit", get(articles::edit_form).post(articles::update))
        .route("/article/{id}/delete", post(articles::delete))
        .route(
            "/article/{id}/comment/{comment_id}/delete",
            post(comments::delete),
        )
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/logout", post(auth::logout))
        .fallback(not_found)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    build_page_router()
        // Inner: needs the Viewer that resolve_session inserts
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{create_test_pool, migrations::run_migrations, DatabasePool, DynDatabasePool};
    use crate::services::csrf::{
        delete_article_intent, delete_comment_intent, ARTICLE_FORM_INTENT, COMMENT_FORM_INTENT,
    };
    use crate::services::CsrfTokenManager;
    use axum::http::{header, HeaderValue, StatusCode};
    use axum_test::TestServer;

    const SECRET: &str = "integration-test-secret";

    async fn setup() -> (TestServer, CsrfTokenManager) {
        let (server, csrf, _pool) = setup_with_pool().await;
        (server, csrf)
    }

    async fn setup_with_pool() -> (TestServer, CsrfTokenManager, DynDatabasePool) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let mut config = Config::default();
        config.security.csrf_secret = Some(SECRET.to_string());

        let state = AppState::new(pool.clone(), &config).unwrap();
        let server = TestServer::new(build_router(state)).unwrap();
        (server, CsrfTokenManager::new(SECRET.as_bytes()).unwrap(), pool)
    }

    fn cookie(session_id: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("session={}", session_id)).unwrap()
    }

    /// Register an account and return its session id
    async fn register(server: &TestServer, username: &str) -> String {
        let response = server
            .post("/register")
            .form(&[
                ("username", username.to_string()),
                ("email", format!("{}@example.com", username)),
                ("password", "password123".to_string()),
            ])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let set_cookie = response.header(header::SET_COOKIE);
        let set_cookie = set_cookie.to_str().unwrap();
        set_cookie
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix("session="))
            .unwrap()
            .to_string()
    }

    async fn create_article(
        server: &TestServer,
        csrf: &CsrfTokenManager,
        session_id: &str,
        title: &str,
        published_on: &str,
    ) -> StatusCode {
        let token = csrf.token(session_id, ARTICLE_FORM_INTENT);
        server
            .post("/article/new")
            .add_header(header::COOKIE, cookie(session_id))
            .form(&[
                ("title", title),
                ("content", "World"),
                ("category", "1"),
                ("author", "Alice"),
                ("published_on", published_on),
                ("_token", token.as_str()),
            ])
            .await
            .status_code()
    }

    async fn list(server: &TestServer, session_id: &str, path: &str) -> String {
        server
            .get(path)
            .add_header(header::COOKIE, cookie(session_id))
            .await
            .text()
    }

    #[tokio::test]
    async fn test_root_redirects_to_list() {
        let (server, _) = setup().await;

        let response = server.get("/").await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION), "/article");
    }

    #[tokio::test]
    async fn test_admin_creates_and_finds_article() {
        let (server, csrf) = setup().await;
        let admin = register(&server, "admin").await;

        let status = create_article(&server, &csrf, &admin, "Hello", "2024-01-01").await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let page = list(&server, &admin, "/article").await;
        assert!(page.contains("Hello"));
        assert!(page.contains("The article was created successfully."));

        // Flash notices are shown once
        let page = list(&server, &admin, "/article").await;
        assert!(!page.contains("The article was created successfully."));

        let page = server.get("/article").add_query_param("q", "Hello").await.text();
        assert!(page.contains("/article/1"));

        let page = server.get("/article").add_query_param("q", "nothing-here").await.text();
        assert!(!page.contains("/article/1\""));
        assert!(page.contains("No articles match"));
    }

    #[tokio::test]
    async fn test_search_orders_newest_first() {
        let (server, csrf) = setup().await;
        let admin = register(&server, "admin").await;

        create_article(&server, &csrf, &admin, "Older Hello", "2023-01-01").await;
        create_article(&server, &csrf, &admin, "Newer Hello", "2024-06-01").await;
        create_article(&server, &csrf, &admin, "Unrelated", "2025-01-01").await;

        let page = server.get("/article").add_query_param("q", "Hello").await.text();
        let newer = page.find("Newer Hello").unwrap();
        let older = page.find("Older Hello").unwrap();
        assert!(newer < older);
        assert!(!page.contains("Unrelated"));
    }

    #[tokio::test]
    async fn test_invalid_article_form_is_redisplayed() {
        let (server, csrf) = setup().await;
        let admin = register(&server, "admin").await;
        let token = csrf.token(&admin, ARTICLE_FORM_INTENT);

        let response = server
            .post("/article/new")
            .add_header(header::COOKIE, cookie(&admin))
            .form(&[
                ("title", ""),
                ("content", "World"),
                ("category", "1"),
                ("author", "Alice"),
                ("published_on", "not-a-date"),
                ("_token", token.as_str()),
            ])
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let page = response.text();
        assert!(page.contains("This value should not be blank."));
        assert!(page.contains("Please enter a valid date."));

        let page = list(&server, &admin, "/article").await;
        assert!(page.contains("No articles yet."));
    }

    #[tokio::test]
    async fn test_non_admins_are_denied() {
        let (server, csrf) = setup().await;
        let admin = register(&server, "admin").await;
        let member = register(&server, "member").await;
        create_article(&server, &csrf, &admin, "Hello", "2024-01-01").await;

        assert_eq!(server.get("/article/new").await.status_code(), StatusCode::FORBIDDEN);

        let response = server
            .get("/article/new")
            .add_header(header::COOKIE, cookie(&member))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = server
            .get("/article/1/edit")
            .add_header(header::COOKIE, cookie(&member))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let token = csrf.token(&member, ARTICLE_FORM_INTENT);
        let fields = |title: &'static str| {
            vec![
                ("title", title.to_string()),
                ("content", "Sneaky content".to_string()),
                ("category", "1".to_string()),
                ("author", "Mallory".to_string()),
                ("published_on", "2024-02-02".to_string()),
                ("_token", token.clone()),
            ]
        };

        let response = server
            .post("/article/new")
            .add_header(header::COOKIE, cookie(&member))
            .form(&fields("Sneaky"))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = server
            .post("/article/1/edit")
            .add_header(header::COOKIE, cookie(&member))
            .form(&fields("Hijacked"))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = server
            .post("/article/1/delete")
            .add_header(header::COOKIE, cookie(&member))
            .form(&[("_token", csrf.token(&member, &delete_article_intent(1)))])
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let page = server.get("/article").await.text();
        assert!(page.contains("Hello"));
        assert!(!page.contains("Sneaky"));
        assert!(!page.contains("/article/2\""));

        let response = server.get("/article/1").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let page = response.text();
        assert!(page.contains("Hello"));
        assert!(!page.contains("Hijacked"));
        assert!(!page.contains("Mallory"));
    }

    #[tokio::test]
    async fn test_show_offers_delete_only_to_admins() {
        let (server, csrf) = setup().await;
        let admin = register(&server, "admin").await;
        let member = register(&server, "member").await;
        create_article(&server, &csrf, &admin, "Hello", "2024-01-01").await;

        let page = list(&server, &admin, "/article/1").await;
        assert!(page.contains("action=\"/article/1/delete\""));
        assert!(page.contains(&csrf.token(&admin, &delete_article_intent(1))));

        let anonymous = csrf.token("", &delete_article_intent(1));
        let page = server.get("/article/1").await.text();
        assert!(!page.contains("/article/1/delete"));
        assert!(!page.contains(&anonymous));

        let page = list(&server, &member, "/article/1").await;
        assert!(!page.contains("/article/1/delete"));
        assert!(!page.contains(&csrf.token(&member, &delete_article_intent(1))));
    }

    #[tokio::test]
    async fn test_delete_failure_becomes_flash() {
        let (server, csrf, pool) = setup_with_pool().await;
        let admin = register(&server, "admin").await;
        create_article(&server, &csrf, &admin, "Hello", "2024-01-01").await;

        pool.execute("DROP TABLE comments").await.unwrap();

        let response = server
            .post("/article/1/delete")
            .add_header(header::COOKIE, cookie(&admin))
            .form(&[("_token", csrf.token(&admin, &delete_article_intent(1)))])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION), "/article");

        let page = list(&server, &admin, "/article").await;
        assert!(page.contains("Error while deleting"));
        assert!(!page.contains("The article was deleted successfully."));
        assert!(page.contains("/article/1\""));
    }

    #[tokio::test]
    async fn test_delete_requires_valid_token() {
        let (server, csrf) = setup().await;
        let admin = register(&server, "admin").await;
        create_article(&server, &csrf, &admin, "Hello", "2024-01-01").await;

        let response = server
            .post("/article/1/delete")
            .add_header(header::COOKIE, cookie(&admin))
            .form(&[("_token", "bogus")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(server.get("/article/1").await.status_code(), StatusCode::OK);

        let page = list(&server, &admin, "/article").await;
        assert!(page.contains("Invalid CSRF token."));

        let response = server
            .post("/article/1/delete")
            .add_header(header::COOKIE, cookie(&admin))
            .form(&[("_token", csrf.token(&admin, &delete_article_intent(1)))])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(server.get("/article/1").await.status_code(), StatusCode::NOT_FOUND);

        let page = list(&server, &admin, "/article").await;
        assert!(page.contains("The article was deleted successfully."));
    }

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let (server, csrf) = setup().await;
        let admin = register(&server, "admin").await;
        let member = register(&server, "member").await;
        let stranger = register(&server, "stranger").await;
        create_article(&server, &csrf, &admin, "Hello", "2024-01-01").await;
        create_article(&server, &csrf, &admin, "Second", "2024-01-02").await;

        // Anonymous submissions are not stored
        let response = server.post("/article/1").form(&[("body", "Drive-by")]).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(!response.text().contains("Drive-by"));

        let token = csrf.token(&member, COMMENT_FORM_INTENT);
        let response = server
            .post("/article/1")
            .add_header(header::COOKIE, cookie(&member))
            .form(&[("body", "Nice post"), ("_token", token.as_str())])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert!(server.get("/article/1").await.text().contains("Nice post"));

        let response = server
            .post("/article/1/comment/1/delete")
            .add_header(header::COOKIE, cookie(&stranger))
            .form(&[("_token", csrf.token(&stranger, &delete_comment_intent(1)))])
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

        let response = server
            .post("/article/2/comment/1/delete")
            .add_header(header::COOKIE, cookie(&admin))
            .form(&[("_token", csrf.token(&admin, &delete_comment_intent(1)))])
            .await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

        // Bad token: silently ignored
        let response = server
            .post("/article/1/comment/1/delete")
            .add_header(header::COOKIE, cookie(&member))
            .form(&[("_token", "bogus")])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert!(server.get("/article/1").await.text().contains("Nice post"));

        let response = server
            .post("/article/1/comment/1/delete")
            .add_header(header::COOKIE, cookie(&member))
            .form(&[("_token", csrf.token(&member, &delete_comment_intent(1)))])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
        assert_eq!(response.header(header::LOCATION), "/article/1");
        assert!(!server.get("/article/1").await.text().contains("Nice post"));
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (server, _) = setup().await;

        assert_eq!(server.get("/article/abc").await.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(server.get("/article/999").await.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(server.get("/nowhere").await.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (server, csrf) = setup().await;
        let admin = register(&server, "admin").await;

        let response = server
            .post("/logout")
            .add_header(header::COOKIE, cookie(&admin))
            .form(&[("_token", csrf.token(&admin, crate::services::csrf::LOGOUT_INTENT))])
            .await;
        assert_eq!(response.status_code(), StatusCode::SEE_OTHER);

        let response = server
            .get("/article/new")
            .add_header(header::COOKIE, cookie(&admin))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }
}
