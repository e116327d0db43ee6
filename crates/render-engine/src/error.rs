//! Errors raised while placing, launching, and monitoring renders.

use std::path::PathBuf;

use farmhand_common::FarmhandError;
use farmhand_order_model::OrderError;

use crate::classify::RenderErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Renderer target '{name}' is not registered in the project config")]
    TargetNotFound { name: String },

    #[error("Failed to start renderer {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Render failed: {0}")]
    Fatal(RenderErrorKind),

    #[error("Renderer exited unsuccessfully ({status}){}", format_tail(.stderr_tail))]
    Unclassified { status: String, stderr_tail: String },

    #[error("Render monitor failed: {0}")]
    Monitor(String),

    #[error("Invalid source file {path}: {reason}")]
    InvalidSource { path: PathBuf, reason: String },

    #[error("Could not read scene settings from {path}: {message}")]
    Probe { path: PathBuf, message: String },

    #[error("Asset packer 'bat' was not found on PATH")]
    PackerUnavailable,

    #[error("Asset packer failed ({status})")]
    PackerFailed { status: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Project(#[from] FarmhandError),
}

pub type RenderResult<T> = Result<T, RenderError>;

impl RenderError {
    /// The classified failure kind, if the renderer printed a known signature.
    pub fn kind(&self) -> Option<RenderErrorKind> {
        match self {
            RenderError::Fatal(kind) => Some(*kind),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn format_tail(tail: &str) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!(": {tail}")
    }
}
