use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Identifier segment count is outside the configured bounds.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Canonical string could not be produced or parsed.
    #[error("canonical encoding error: {0}")]
    Canonical(String),

    #[error("invalid content type: {0}")]
    InvalidContentType(String),
}
