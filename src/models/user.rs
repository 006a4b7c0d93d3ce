//! User model
//!
//! Registered users and their roles. Admins author articles; members may
//! only comment and remove their own comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User entity representing a registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role
    pub role: UserRole,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with an already hashed password.
    ///
    /// Use `services::password::hash_password()` to produce the hash.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            role,
            created_at: Utc::now(),
        }
    }

    /// Check if the user is an administrator
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Administrator - manages articles and any comment
    Admin,
    /// Member - comments, and deletes own comments
    #[default]
    Member,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Member => write!(f, "member"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "member" => Ok(UserRole::Member),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}
