//! HTML views
//!
//! Tera templates compiled into the binary from `templates/`. A directory
//! given in `templates.path` may override any of them by relative name
//! (e.g. `article/show.html`). HTML auto-escaping is on for every template.

use rust_embed::RustEmbed;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ViewError;

#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Compiled template set
pub struct Views {
    tera: Tera,
}

impl Views {
    /// Load the embedded templates, then apply overrides from `override_dir`
    pub fn load(override_dir: Option<&Path>) -> Result<Self, ViewError> {
        let mut templates: Vec<(String, String)> = Vec::new();

        for name in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(&name) {
                let content = String::from_utf8_lossy(&file.data).into_owned();
                templates.push((name.into_owned(), content));
            }
        }

        if let Some(dir) = override_dir {
            let mut overrides = Vec::new();
            collect_templates_from_dir(dir, dir, &mut overrides)?;
            for (name, content) in overrides {
                tracing::info!(template = %name, "Using template override");
                templates.retain(|(existing, _)| existing != &name);
                templates.push((name, content));
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ViewError::TemplateError(describe(&e)))?;

        Ok(Self { tera })
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ViewError> {
        self.tera
            .render(template, context)
            .map_err(|e| ViewError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e))))
    }

    /// Names of every loaded template
    pub fn template_names(&self) -> Vec<&str> {
        self.tera.get_template_names().collect()
    }
}

// Tera hides the useful part of the message in the source chain.
fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ViewError> {
    if !current_path.exists() {
        return Ok(());
    }

    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().is_some_and(|ext| ext == "html") {
            let relative = path
                .strip_prefix(base_path)
                .map_err(|_| ViewError::TemplateError("Failed to get relative path".to_string()))?;
            let name = relative.to_string_lossy().replace('\\', "/");
            let content = fs::read_to_string(&path)?;
            templates.push((name, content));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormErrors;
    use tempfile::TempDir;

    fn base_context() -> TeraContext {
        let mut context = TeraContext::new();
        context.insert("current_user", &Option::<String>::None);
        context.insert("flashes", &Vec::<crate::models::Flash>::new());
        context.insert("logout_token", "");
        context
    }

    #[test]
    fn test_embedded_templates_load() {
        let views = Views::load(None).expect("templates should compile");
        let names = views.template_names();
        for expected in [
            "base.html",
            "error.html",
            "article/index.html",
            "article/new.html",
            "article/edit.html",
            "article/_form.html",
            "article/show.html",
            "security/login.html",
            "security/register.html",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_error_page_renders() {
        let views = Views::load(None).unwrap();
        let mut context = base_context();
        context.insert("status", &404);
        context.insert("message", "Article not found");
        let html = views.render("error.html", &context).unwrap();
        assert!(html.contains("Article not found"));
    }

    #[test]
    fn test_login_escapes_input() {
        let views = Views::load(None).unwrap();
        let mut context = base_context();
        context.insert("username", "<script>");
        context.insert("error", &Option::<String>::None);
        context.insert("errors", &FormErrors::default());
        let html = views.render("security/login.html", &context).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_override_directory_replaces_template() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("error.html"), "custom {{ status }}").unwrap();

        let views = Views::load(Some(dir.path())).unwrap();
        let mut context = base_context();
        context.insert("status", &403);
        context.insert("message", "nope");
        assert_eq!(views.render("error.html", &context).unwrap(), "custom 403");
    }

    #[test]
    fn test_missing_template_is_error() {
        let views = Views::load(None).unwrap();
        let result = views.render("nope.html", &TeraContext::new());
        assert!(matches!(result, Err(ViewError::TemplateError(_))));
    }
}
