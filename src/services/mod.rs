//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They own the
//! business rules (who may do what, how a search behaves, what a login
//! creates) and translate repository failures into their own error types.

pub mod access;
pub mod article;
pub mod comment;
pub mod csrf;
pub mod flash;
pub mod password;
pub mod user;

pub use access::{authorize, Action, Decision};
pub use article::{ArticleService, ArticleServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use csrf::CsrfTokenManager;
pub use flash::FlashService;
pub use password::{hash_password, verify_password};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
