//! User-level application configuration.
//!
//! Settings that belong to the machine running Farmhand rather than to a
//! shared project: logging, host identity override, and how the render
//! monitor treats the external renderer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-user application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides the OS hostname as this machine's claim identity.
    pub host_id: Option<String>,

    /// Render monitor behaviour.
    pub monitor: MonitorConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// How a render run is supervised.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Delay before the output reader attaches, in milliseconds.
    pub startup_grace_ms: u64,

    /// What to do with the renderer once a fatal line has been seen.
    pub fatal_policy: FatalPolicy,
}

/// Reaction to a fatal renderer signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FatalPolicy {
    /// Stop classifying, keep draining output, and wait for the renderer to exit.
    #[default]
    LetExit,
    /// Kill the renderer as soon as a fatal line is seen.
    Kill,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "farmhand=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            startup_grace_ms: 1000,
            fatal_policy: FatalPolicy::LetExit,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    base.join("farmhand").join("config.json")
}

/// The current user's home directory, or the temp directory when unset.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}
