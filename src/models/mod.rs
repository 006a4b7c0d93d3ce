//! Data models
//!
//! Database entities (Article, Category, Comment, User, Session, Flash) and
//! the validated input types the form layer produces for them.

mod article;
mod category;
mod comment;
mod flash;
mod session;
mod user;

pub use article::{Article, ArticleInput};
pub use category::Category;
pub use comment::{Comment, CommentWithAuthor};
pub use flash::{Flash, FlashLevel};
pub use session::Session;
pub use user::{User, UserRole};
