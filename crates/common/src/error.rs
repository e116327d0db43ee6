//! Error types shared across Farmhand crates.

use std::path::PathBuf;

/// Top-level error type for Farmhand operations.
#[derive(Debug, thiserror::Error)]
pub enum FarmhandError {
    #[error("No Farmhand project found at or above {start}")]
    ProjectNotFound { start: PathBuf },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Renderer target '{name}' is not in the project config")]
    TargetNotFound { name: String },

    #[error("Cannot determine host identity: {message}")]
    HostIdentity { message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    TomlEncode(#[from] toml::ser::Error),
}

/// Result type alias using FarmhandError.
pub type FarmhandResult<T> = Result<T, FarmhandError>;

impl FarmhandError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn target_not_found(name: impl Into<String>) -> Self {
        Self::TargetNotFound { name: name.into() }
    }
}
