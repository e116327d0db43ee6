//! Errors raised by the order store.

use std::path::PathBuf;

/// Errors that can occur when reading or writing orders.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to encode order '{name}': {source}")]
    EncodeError {
        name: String,
        source: toml::ser::Error,
    },

    #[error("Invalid order at {path}: {message}")]
    ValidationError { path: PathBuf, message: String },

    #[error("No order named '{name}'")]
    NotFound { name: String },

    #[error("Order '{name}' already exists")]
    AlreadyExists { name: String },

    #[error("Every order name is taken; clean finished orders first")]
    NamesExhausted,
}

/// Result type alias using OrderError.
pub type OrderResult<T> = Result<T, OrderError>;

impl OrderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}
