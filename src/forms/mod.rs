//! Form binding and validation
//!
//! Each form is the raw, string-typed body of a POST. `validate` turns it into
//! the typed input the services accept, or into `FormErrors` that the page
//! re-renders next to the fields. Validation never touches the database: any
//! lookup data it needs (the category list) is passed in.

mod article;
mod comment;

pub use article::ArticleForm;
pub use comment::CommentForm;

use serde::Serialize;
use std::collections::BTreeMap;

pub const BLANK: &str = "This value should not be blank.";
pub const CSRF_INVALID: &str = "The CSRF token is invalid. Please try to resubmit the form.";

/// Errors collected while validating a form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    /// Errors not tied to a field
    pub global: Vec<String>,
    /// Errors keyed by field name
    pub fields: BTreeMap<&'static str, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_global(&mut self, message: impl Into<String>) {
        self.global.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.fields.is_empty()
    }

    /// Messages recorded for `field`
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

/// Fold a CSRF verdict into a validation result.
///
/// A bad token fails the form even when every field is valid, and is
/// reported alongside any field errors.
pub fn require_csrf<T>(result: Result<T, FormErrors>, token_valid: bool) -> Result<T, FormErrors> {
    if token_valid {
        return result;
    }
    let mut errors = result.err().unwrap_or_default();
    errors.add_global(CSRF_INVALID);
    Err(errors)
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_errors_collect() {
        let mut errors = FormErrors::default();
        assert!(errors.is_empty());

        errors.add("title", BLANK);
        errors.add("title", "second");
        assert_eq!(errors.field("title").len(), 2);
        assert!(errors.field("content").is_empty());
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_require_csrf_passes_through_when_valid() {
        assert_eq!(require_csrf(Ok::<_, FormErrors>(5), true), Ok(5));
    }

    #[test]
    fn test_require_csrf_fails_valid_form() {
        let err = require_csrf(Ok::<_, FormErrors>(5), false).unwrap_err();
        assert_eq!(err.global, vec![CSRF_INVALID.to_string()]);
    }

    #[test]
    fn test_require_csrf_keeps_field_errors() {
        let mut errors = FormErrors::default();
        errors.add("body", BLANK);
        let err = require_csrf(Err::<(), _>(errors), false).unwrap_err();
        assert_eq!(err.field("body"), &[BLANK.to_string()]);
        assert_eq!(err.global.len(), 1);
    }
}
