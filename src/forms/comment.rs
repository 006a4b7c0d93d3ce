//! Comment form on the article page

use super::{is_blank, FormErrors, BLANK};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CommentForm {
    pub body: String,
    #[serde(rename = "_token", skip_serializing)]
    pub token: Option<String>,
}

impl CommentForm {
    /// The comment body, or errors
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        if is_blank(&self.body) {
            errors.add("body", BLANK);
        }
        errors.into_result(|| self.body.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_required() {
        let form = CommentForm {
            body: "  ".to_string(),
            token: None,
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.field("body"), &[BLANK.to_string()]);
    }

    #[test]
    fn test_body_trimmed() {
        let form = CommentForm {
            body: "  nice post \n".to_string(),
            token: Some("t".to_string()),
        };
        assert_eq!(form.validate().unwrap(), "nice post");
    }
}
