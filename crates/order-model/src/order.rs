//! The render order record.
//!
//! An order is one unit of render work. Its manifest (`order.toml`) holds
//! the parameters handed to the renderer plus the `complete` flag; the
//! claim marker beside it is surfaced here as [`Order::lock`] but is never
//! part of the manifest body.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output path meaning "leave the project's own output setting alone".
pub const PROJECT_DEFAULT_OUTPUT: &str = ".";

/// One queued render.
///
/// Field order is the manifest's serialisation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Short identifier; also the order's directory and lock key.
    name: String,

    /// Logical renderer name, resolved through the project target registry.
    #[serde(default)]
    pub renderer_target: String,

    /// Placement time; establishes FIFO order among pending orders.
    pub created_at: DateTime<Utc>,

    /// First frame to render.
    #[serde(default)]
    pub frame_start: u32,

    /// Last frame to render.
    #[serde(default)]
    pub frame_end: u32,

    /// Forced output resolution. Both zero keeps the project's own.
    #[serde(default)]
    pub resolution_x: u32,
    #[serde(default)]
    pub resolution_y: u32,

    /// Canonical source file (project-relative).
    pub source_path: String,

    /// File actually rendered: `source_path` or a packed copy of it.
    pub target_path: String,

    /// Output location (project-relative), or [`PROJECT_DEFAULT_OUTPUT`].
    #[serde(default = "default_output")]
    pub output_path: String,

    /// Whether existing frames are re-rendered.
    #[serde(default)]
    pub overwrite: Toggle,

    /// Whether empty placeholder frames are written while rendering.
    #[serde(default)]
    pub use_placeholders: Toggle,

    /// Set once, after a successful render.
    #[serde(default)]
    pub complete: bool,

    /// Host currently holding the claim marker, read at load time.
    #[serde(skip)]
    lock: Option<String>,
}

fn default_output() -> String {
    PROJECT_DEFAULT_OUTPUT.to_string()
}

impl Order {
    /// Create a pending order rendering `source_path` in place.
    pub fn new(
        name: impl Into<String>,
        source_path: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let source_path = source_path.into();
        Self {
            name: name.into(),
            renderer_target: String::new(),
            created_at,
            frame_start: 0,
            frame_end: 0,
            resolution_x: 0,
            resolution_y: 0,
            target_path: source_path.clone(),
            source_path,
            output_path: default_output(),
            overwrite: Toggle::Unspecified,
            use_placeholders: Toggle::Unspecified,
            complete: false,
            lock: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of frames in the range; zero for single-frame or unset ranges.
    pub fn frame_count(&self) -> u32 {
        self.frame_end.saturating_sub(self.frame_start)
    }

    /// Claimant recorded in the lock marker when this order was read.
    pub fn lock(&self) -> Option<&str> {
        self.lock.as_deref()
    }

    pub(crate) fn set_lock(&mut self, holder: Option<String>) {
        self.lock = holder.filter(|h| !h.is_empty());
    }

    /// Whether an explicit resolution override is present.
    pub fn has_resolution_override(&self) -> bool {
        self.resolution_x > 0 && self.resolution_y > 0
    }

    /// Whether the renderer's output location should be rewritten.
    pub fn relocates_output(&self) -> bool {
        !self.output_path.is_empty() && self.output_path != PROJECT_DEFAULT_OUTPUT
    }

    /// Whether this order renders a packed copy rather than the source itself.
    pub fn is_cached(&self) -> bool {
        self.target_path != self.source_path
    }

    /// Check the record's own invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("order name is empty".to_string());
        }
        if self.frame_end != 0 && self.frame_end < self.frame_start {
            return Err(format!(
                "frame_end {} is before frame_start {}",
                self.frame_end, self.frame_start
            ));
        }
        if self.target_path.is_empty() {
            return Err("target_path is empty".to_string());
        }
        Ok(())
    }
}

/// A setting the order may force on or off, or leave to the project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    /// Defer to the project file's own value.
    #[default]
    Unspecified,
    Yes,
    No,
}

impl Toggle {
    /// The forced value, if any.
    pub fn forced(self) -> Option<bool> {
        match self {
            Toggle::Unspecified => None,
            Toggle::Yes => Some(true),
            Toggle::No => Some(false),
        }
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value {
            Toggle::Yes
        } else {
            Toggle::No
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toggle::Unspecified => f.write_str("[set by file]"),
            Toggle::Yes => f.write_str("yes"),
            Toggle::No => f.write_str("no"),
        }
    }
}

impl FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yes" | "true" | "on" | "1" => Ok(Toggle::Yes),
            "no" | "false" | "off" | "0" => Ok(Toggle::No),
            "unspecified" | "file" | "" => Ok(Toggle::Unspecified),
            other => Err(format!("expected yes or no, got '{other}'")),
        }
    }
}
