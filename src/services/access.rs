//! Access control
//!
//! A single predicate decides whether a requester may perform an action.
//! Handlers ask it after the target entity has been found, so a missing
//! entity is reported as not found before any access decision is made.

use crate::models::{Comment, User};

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Something a requester wants to do
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    CreateArticle,
    EditArticle,
    DeleteArticle,
    CreateComment,
    DeleteComment(&'a Comment),
}

/// Decide whether `requester` (None for anonymous) may perform `action`.
///
/// Article management is admin only. Any signed-in user may comment. A
/// comment may be deleted by its author or by an admin.
pub fn authorize(requester: Option<&User>, action: Action<'_>) -> Decision {
    let Some(user) = requester else {
        return Decision::Deny;
    };

    let allowed = match action {
        Action::CreateArticle | Action::EditArticle | Action::DeleteArticle => user.is_admin(),
        Action::CreateComment => true,
        Action::DeleteComment(comment) => user.is_admin() || comment.user_id == user.id,
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use proptest::prelude::*;

    fn user(id: i64, role: UserRole) -> User {
        let mut user = User::new(
            format!("user{}", id),
            format!("user{}@example.com", id),
            "hash".to_string(),
            role,
        );
        user.id = id;
        user
    }

    fn comment_by(user_id: i64) -> Comment {
        let mut comment = Comment::new(user_id, 1, "hi".to_string());
        comment.id = 10;
        comment
    }

    #[test]
    fn test_anonymous_denied_everything() {
        let comment = comment_by(1);
        for action in [
            Action::CreateArticle,
            Action::EditArticle,
            Action::DeleteArticle,
            Action::CreateComment,
            Action::DeleteComment(&comment),
        ] {
            assert_eq!(authorize(None, action), Decision::Deny);
        }
    }

    #[test]
    fn test_member_cannot_manage_articles() {
        let member = user(2, UserRole::Member);
        assert_eq!(authorize(Some(&member), Action::CreateArticle), Decision::Deny);
        assert_eq!(authorize(Some(&member), Action::EditArticle), Decision::Deny);
        assert_eq!(authorize(Some(&member), Action::DeleteArticle), Decision::Deny);
        assert_eq!(authorize(Some(&member), Action::CreateComment), Decision::Allow);
    }

    #[test]
    fn test_admin_manages_articles() {
        let admin = user(1, UserRole::Admin);
        assert!(authorize(Some(&admin), Action::CreateArticle).is_allowed());
        assert!(authorize(Some(&admin), Action::EditArticle).is_allowed());
        assert!(authorize(Some(&admin), Action::DeleteArticle).is_allowed());
    }

    #[test]
    fn test_comment_delete_owner_or_admin() {
        let comment = comment_by(2);
        let author = user(2, UserRole::Member);
        let stranger = user(3, UserRole::Member);
        let admin = user(1, UserRole::Admin);

        assert!(authorize(Some(&author), Action::DeleteComment(&comment)).is_allowed());
        assert!(authorize(Some(&admin), Action::DeleteComment(&comment)).is_allowed());
        assert!(!authorize(Some(&stranger), Action::DeleteComment(&comment)).is_allowed());
    }

    proptest! {
        #[test]
        fn prop_comment_delete_matches_ownership(
            requester_id in 1i64..50,
            author_id in 1i64..50,
            is_admin in any::<bool>(),
        ) {
            let role = if is_admin { UserRole::Admin } else { UserRole::Member };
            let requester = user(requester_id, role);
            let comment = comment_by(author_id);

            let expected = is_admin || requester_id == author_id;
            prop_assert_eq!(
                authorize(Some(&requester), Action::DeleteComment(&comment)).is_allowed(),
                expected
            );
        }

        #[test]
        fn prop_article_actions_require_admin(id in 1i64..1000, is_admin in any::<bool>()) {
            let role = if is_admin { UserRole::Admin } else { UserRole::Member };
            let requester = user(id, role);
            for action in [Action::CreateArticle, Action::EditArticle, Action::DeleteArticle] {
                prop_assert_eq!(authorize(Some(&requester), action).is_allowed(), is_admin);
            }
        }
    }
}
