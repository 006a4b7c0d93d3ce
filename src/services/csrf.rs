//! CSRF tokens
//!
//! A token is `base64url(HMAC-SHA256(secret, session_id || 0x00 || intent))`.
//! Binding to the session id keeps a token from one login from working in
//! another; binding to an intent keeps a token for one form or one row from
//! authorizing a different action. Anonymous visitors bind to the empty
//! session id.

use anyhow::{anyhow, Result};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Intent for the article create/edit form
pub const ARTICLE_FORM_INTENT: &str = "article";
/// Intent for the comment form on the article page
pub const COMMENT_FORM_INTENT: &str = "comment";
/// Intent for the logout button
pub const LOGOUT_INTENT: &str = "logout";

/// Intent for deleting article `id`
pub fn delete_article_intent(id: i64) -> String {
    format!("delete{}", id)
}

/// Intent for deleting comment `id`
pub fn delete_comment_intent(id: i64) -> String {
    format!("delete-comment{}", id)
}

/// Issues and checks CSRF tokens under one secret
#[derive(Clone)]
pub struct CsrfTokenManager {
    mac: HmacSha256,
}

impl CsrfTokenManager {
    /// Create a manager keyed with `secret`
    pub fn new(secret: &[u8]) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| anyhow!("Invalid CSRF secret: {}", e))?;
        Ok(Self { mac })
    }

    /// Create a manager with a fresh random 32-byte secret.
    ///
    /// Tokens issued before a restart stop validating.
    pub fn random() -> Result<Self> {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::new(&secret)
    }

    fn keyed(&self, session_id: &str, intent: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(session_id.as_bytes());
        mac.update(&[0]);
        mac.update(intent.as_bytes());
        mac
    }

    /// Token for `intent` within `session_id`
    pub fn token(&self, session_id: &str, intent: &str) -> String {
        let tag = self.keyed(session_id, intent).finalize().into_bytes();
        BASE64URL_NOPAD.encode(&tag)
    }

    /// Constant-time check of a submitted token. Missing or undecodable tokens fail.
    pub fn is_valid(&self, session_id: &str, intent: &str, token: Option<&str>) -> bool {
        let Some(token) = token else {
            return false;
        };
        let Ok(tag) = BASE64URL_NOPAD.decode(token.as_bytes()) else {
            return false;
        };
        self.keyed(session_id, intent).verify_slice(&tag).is_ok()
    }
}

impl std::fmt::Debug for CsrfTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfTokenManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn manager() -> CsrfTokenManager {
        CsrfTokenManager::new(b"0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn test_token_validates_for_same_binding() {
        let csrf = manager();
        let token = csrf.token("session-a", "delete7");
        assert!(csrf.is_valid("session-a", "delete7", Some(&token)));
    }

    #[test]
    fn test_token_rejected_for_other_intent_or_session() {
        let csrf = manager();
        let token = csrf.token("session-a", &delete_article_intent(7));

        assert!(!csrf.is_valid("session-a", &delete_article_intent(8), Some(&token)));
        assert!(!csrf.is_valid("session-b", &delete_article_intent(7), Some(&token)));
        assert!(!csrf.is_valid("session-a", &delete_comment_intent(7), Some(&token)));
    }

    #[test]
    fn test_missing_or_garbage_token_rejected() {
        let csrf = manager();
        assert!(!csrf.is_valid("s", "logout", None));
        assert!(!csrf.is_valid("s", "logout", Some("")));
        assert!(!csrf.is_valid("s", "logout", Some("not base64 !!")));
    }

    #[test]
    fn test_different_secrets_disagree() {
        let token = manager().token("s", "article");
        let other = CsrfTokenManager::random().unwrap();
        assert!(!other.is_valid("s", "article", Some(&token)));
    }

    #[test]
    fn test_separator_prevents_boundary_shift() {
        let csrf = manager();
        let token = csrf.token("ab", "c");
        assert!(!csrf.is_valid("a", "bc", Some(&token)));
    }

    #[test]
    fn test_intent_names() {
        assert_eq!(delete_article_intent(12), "delete12");
        assert_eq!(delete_comment_intent(3), "delete-comment3");
    }

    proptest! {
        #[test]
        fn prop_issued_tokens_validate(session in "[a-z0-9-]{0,36}", intent in "[a-z-]{1,20}[0-9]{0,5}") {
            let csrf = manager();
            let token = csrf.token(&session, &intent);
            prop_assert!(csrf.is_valid(&session, &intent, Some(&token)));
        }

        #[test]
        fn prop_tampered_tokens_fail(session in "[a-z0-9]{1,16}", flip in 0usize..43) {
            let csrf = manager();
            let token = csrf.token(&session, "article");
            let mut bytes = token.into_bytes();
            let i = flip % bytes.len();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            prop_assert!(!csrf.is_valid(&session, "article", Some(&tampered)));
        }
    }
}
