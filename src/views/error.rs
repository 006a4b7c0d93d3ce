//! View error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    /// Template failed to parse or render
    #[error("Template error: {0}")]
    TemplateError(String),

    /// An override template could not be read
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
