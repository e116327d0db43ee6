//! Project discovery, on-disk layout, and the renderer target registry.
//!
//! A project is any directory containing a `.farmhand/` folder. Several
//! hosts may share one project over a network filesystem; everything they
//! coordinate on lives under that folder.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::home_dir;
use crate::error::{FarmhandError, FarmhandResult};

/// Marker directory at the project root.
pub const FARMHAND_DIR: &str = ".farmhand";
/// Queue root, relative to the project root.
pub const ORDERS_DIR: &str = ".farmhand/orders";
/// Shared project config, relative to the project root.
pub const CONFIG_PATH: &str = ".farmhand/config.toml";
/// Manifest file name inside an order directory.
pub const MANIFEST_NAME: &str = "order.toml";
/// Claim marker file name inside an order directory.
pub const LOCK_NAME: &str = "lock.txt";

/// Reserved target name that maps to `default_target`.
pub const DEFAULT_TARGET: &str = "default";

#[cfg(target_os = "linux")]
const PLATFORM_CONFIG_PATH: &str = ".farmhand/config_linux.toml";
#[cfg(target_os = "macos")]
const PLATFORM_CONFIG_PATH: &str = ".farmhand/config_macos.toml";
#[cfg(target_os = "windows")]
const PLATFORM_CONFIG_PATH: &str = ".farmhand/config_windows.toml";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const PLATFORM_CONFIG_PATH: &str = CONFIG_PATH;

/// Shared project configuration (`.farmhand/config.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Target used when an order does not name one.
    #[serde(default)]
    pub default_target: String,

    /// Known renderer executables.
    #[serde(default, rename = "target")]
    pub targets: Vec<RendererTarget>,
}

/// A logical renderer name and the executable it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererTarget {
    pub name: String,
    pub path: String,
}

impl ProjectConfig {
    /// Resolve a logical target name to an executable path.
    ///
    /// An empty name and [`DEFAULT_TARGET`] both resolve through
    /// `default_target`.
    pub fn resolve(&self, name: &str) -> FarmhandResult<PathBuf> {
        let wanted = if name.is_empty() || name == DEFAULT_TARGET {
            self.default_target.as_str()
        } else {
            name
        };

        self.targets
            .iter()
            .find(|t| t.name == wanted)
            .map(|t| expand_home(&t.path))
            .ok_or_else(|| FarmhandError::target_not_found(wanted))
    }

    /// Register a target. Returns false when the exact entry already exists.
    pub fn add_target(&mut self, name: impl Into<String>, path: impl Into<String>) -> bool {
        let name = name.into();
        let path = path.into().replace('\\', "/");
        if self
            .targets
            .iter()
            .any(|t| t.name == name && t.path == path)
        {
            return false;
        }
        self.targets.push(RendererTarget { name, path });
        true
    }

    /// Commented config written by `init`.
    pub fn template() -> &'static str {
        CONFIG_TEMPLATE
    }
}

#[cfg(target_os = "windows")]
const CONFIG_TEMPLATE: &str = r#"# target used when an order does not name one
default_target = "4.2"

# example entries: edit the paths to match this machine
[[target]]
name = "3.6"
path = "C:/Program Files/Blender Foundation/Blender 3.6/blender.exe"

[[target]]
name = "4.2"
path = "C:/Program Files/Blender Foundation/Blender 4.2/blender.exe"
"#;

#[cfg(target_os = "macos")]
const CONFIG_TEMPLATE: &str = r#"# target used when an order does not name one
default_target = "4.2"

# example entries: edit the paths to match this machine
[[target]]
name = "3.6"
path = "/Applications/Blender 3.6.app/Contents/MacOS/blender"

[[target]]
name = "4.2"
path = "/Applications/Blender 4.2.app/Contents/MacOS/blender"
"#;

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const CONFIG_TEMPLATE: &str = r#"# target used when an order does not name one
default_target = "4.2"

# example entries: edit the paths to match this machine
[[target]]
name = "3.6"
path = "~/software/blender-3.6/blender"

[[target]]
name = "4.2"
path = "~/software/blender-4.2/blender"
"#;

/// A discovered project with its parsed config.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project root (the parent of `.farmhand/`).
    pub root: PathBuf,

    /// File the config was read from.
    pub config_path: PathBuf,

    /// Parsed config.
    pub config: ProjectConfig,
}

impl LoadedProject {
    /// Walk up from `start` until a directory containing `.farmhand/` is found.
    pub fn discover(start: impl AsRef<Path>) -> FarmhandResult<Self> {
        let start = start.as_ref();
        let root = start
            .ancestors()
            .find(|dir| dir.join(FARMHAND_DIR).is_dir())
            .ok_or_else(|| FarmhandError::ProjectNotFound {
                start: start.to_path_buf(),
            })?;
        Self::load(root)
    }

    /// Load the project rooted at `root`, preferring the platform config.
    pub fn load(root: impl AsRef<Path>) -> FarmhandResult<Self> {
        let root = root.as_ref().to_path_buf();

        let platform_path = root.join(PLATFORM_CONFIG_PATH);
        let config_path = if platform_path.is_file() {
            platform_path
        } else {
            root.join(CONFIG_PATH)
        };

        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| FarmhandError::io(&config_path, e))?;
        let config: ProjectConfig =
            toml::from_str(&content).map_err(|e| FarmhandError::TomlParse {
                path: config_path.clone(),
                source: e,
            })?;

        tracing::debug!(
            root = %root.display(),
            config = %config_path.display(),
            targets = config.targets.len(),
            "Loaded project"
        );

        Ok(Self {
            root,
            config_path,
            config,
        })
    }

    /// Create the `.farmhand/` skeleton and a template config under `root`.
    pub fn init(root: impl AsRef<Path>) -> FarmhandResult<Self> {
        let root = root.as_ref().to_path_buf();
        let orders = root.join(ORDERS_DIR);
        std::fs::create_dir_all(&orders).map_err(|e| FarmhandError::io(&orders, e))?;

        let config_path = root.join(CONFIG_PATH);
        if config_path.exists() {
            return Err(FarmhandError::config(format!(
                "{} already exists",
                config_path.display()
            )));
        }
        std::fs::write(&config_path, ProjectConfig::template())
            .map_err(|e| FarmhandError::io(&config_path, e))?;

        Self::load(root)
    }

    /// Write the config back to the file it was loaded from.
    pub fn save_config(&self) -> FarmhandResult<()> {
        let content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, content)
            .map_err(|e| FarmhandError::io(&self.config_path, e))
    }

    /// Queue root directory.
    pub fn orders_dir(&self) -> PathBuf {
        self.root.join(ORDERS_DIR)
    }
}

/// Directory holding one order.
pub fn order_dir(root: &Path, name: &str) -> PathBuf {
    root.join(ORDERS_DIR).join(name)
}

/// Manifest path for one order.
pub fn manifest_path(root: &Path, name: &str) -> PathBuf {
    order_dir(root, name).join(MANIFEST_NAME)
}

/// Claim marker path for one order.
pub fn lock_path(root: &Path, name: &str) -> PathBuf {
    order_dir(root, name).join(LOCK_NAME)
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().join(rest),
        None => PathBuf::from(path),
    }
}
