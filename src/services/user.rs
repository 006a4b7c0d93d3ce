//! User service
//!
//! Registration, login/logout and session validation:
//! - the first user to register becomes admin, later users are members
//! - login checks the argon2 hash and opens a session row
//! - expired sessions are deleted when they are presented

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("{0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("{0}")]
    ValidationError(String),

    /// User already exists
    #[error("{0}")]
    UserExists(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for registering a new user
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Input for logging in
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the given repositories
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a new user.
    ///
    /// The first account in an empty system is made admin.
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let input = RegisterInput {
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            password: input.password,
        };
        validate_register_input(&input)?;

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }

        if self
            .user_repo
            .get_by_email(&input.email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                input.email
            )));
        }

        let existing = self.user_repo.count().await.context("Failed to count users")?;
        let role = if existing == 0 {
            UserRole::Admin
        } else {
            UserRole::Member
        };

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let user = User::new(input.username, input.email, password_hash, role);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, role = %created.role, "User registered");
        Ok(created)
    }

    /// Verify credentials and open a new session.
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .user_repo
            .get_by_username(input.username.trim())
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::warn!(user_id = user.id, "Login rejected: wrong password");
            return Err(invalid());
        }

        let session = self.create_session(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok(session)
    }

    /// Open a session for an already authenticated user
    pub async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, Duration::days(self.session_expiration_days));
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }

    /// Invalidate a session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown tokens yield `None`. Expired sessions are deleted and yield `None`.
    pub async fn validate_session(&self, token: &str) -> Result<Option<(Session, User)>, UserServiceError> {
        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            self.session_repo
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?;

        Ok(user.map(|user| (session, user)))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    /// Remove every expired session, returning how many went away
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(removed)
    }
}

fn validate_register_input(input: &RegisterInput) -> Result<(), UserServiceError> {
    let username_len = input.username.chars().count();
    if !(3..=50).contains(&username_len) {
        return Err(UserServiceError::ValidationError(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    if !input
        .username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(UserServiceError::ValidationError(
            "Username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    if !is_plausible_email(&input.email) {
        return Err(UserServiceError::ValidationError(
            "Email address is not valid".to_string(),
        ));
    }
    if input.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    fn input(name: &str) -> RegisterInput {
        RegisterInput {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_user_is_admin_then_members() {
        let service = service().await;
        let first = service.register(input("alice")).await.unwrap();
        let second = service.register(input("bob")).await.unwrap();

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::Member);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let service = service().await;
        service.register(input("alice")).await.unwrap();

        let dup = service.register(input("alice")).await;
        assert!(matches!(dup, Err(UserServiceError::UserExists(_))));

        let mut short = input("carol");
        short.password = "short".to_string();
        assert!(matches!(
            service.register(short).await,
            Err(UserServiceError::ValidationError(_))
        ));

        let mut bad_email = input("dave");
        bad_email.email = "dave".to_string();
        assert!(matches!(
            service.register(bad_email).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let service = service().await;
        let user = service.register(input("alice")).await.unwrap();

        let session = service
            .login(LoginInput {
                username: "alice".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        let (_, resolved) = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = service().await;
        service.register(input("alice")).await.unwrap();

        let result = service
            .login(LoginInput {
                username: "alice".to_string(),
                password: "not-the-password".to_string(),
            })
            .await;
        assert!(matches!(result, Err(UserServiceError::AuthenticationError(_))));

        let unknown = service
            .login(LoginInput {
                username: "nobody".to_string(),
                password: "password123".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            -1,
        );
        let user = service.register(input("alice")).await.unwrap();
        let session = service.create_session(user.id).await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[test]
    fn test_email_plausibility() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("ab.co"));
    }
}
