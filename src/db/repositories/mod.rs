//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for a specific entity.

pub mod article;
pub mod category;
pub mod comment;
pub mod flash;
pub mod session;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, CommentRepositoryImpl};
pub use flash::{FlashRepository, SqlxFlashRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
