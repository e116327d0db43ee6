//! Farmhand Common Utilities
//!
//! Shared infrastructure for all Farmhand crates:
//! - Error types and result aliases
//! - Project discovery, layout, and the renderer target registry
//! - User configuration and host identity
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod project;

pub use config::*;
pub use error::*;
pub use host::*;
pub use project::*;
