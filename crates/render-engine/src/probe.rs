//! Reading frame range and resolution out of a scene file.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{RenderError, RenderResult};

const PROBE_SCRIPT: &str = include_str!("../assets/probe_scene.py");

/// Scene settings as saved in the source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub frame_start: u32,
    pub frame_end: u32,
    /// Effective output width, already scaled by the scene's percentage.
    pub resolution_x: u32,
    pub resolution_y: u32,
}

/// Ask `renderer` for the frame range and output size saved in `source`.
pub async fn probe_source(renderer: &Path, source: &Path) -> RenderResult<SourceInfo> {
    tracing::debug!(
        renderer = %renderer.display(),
        source = %source.display(),
        "Probing scene settings"
    );

    let output = Command::new(renderer)
        .arg("-b")
        .arg(source)
        .arg("--python-expr")
        .arg(PROBE_SCRIPT)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|source| RenderError::Spawn {
            program: renderer.to_path_buf(),
            source,
        })?;

    let text = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&text).ok_or_else(|| RenderError::Probe {
        path: source.to_path_buf(),
        message: format!("renderer printed no frame range (exit {})", output.status),
    })
}

/// Extract [`SourceInfo`] from probe output. The range line is required;
/// a missing resolution line leaves the size at zero.
pub fn parse_probe_output(text: &str) -> Option<SourceInfo> {
    let mut info = SourceInfo::default();
    let mut have_range = false;

    for line in text.lines() {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("farmhand_range") => {
                let values: Vec<u32> = fields.filter_map(|f| f.parse().ok()).collect();
                if let [start, end] = values.as_slice() {
                    info.frame_start = *start;
                    info.frame_end = *end;
                    have_range = true;
                }
            }
            Some("farmhand_res") => {
                let values: Vec<u32> = fields.filter_map(|f| f.parse().ok()).collect();
                if let [x, y, percent] = values.as_slice() {
                    info.resolution_x = scale(*x, *percent);
                    info.resolution_y = scale(*y, *percent);
                }
            }
            _ => {}
        }
    }

    have_range.then_some(info)
}

fn scale(value: u32, percent: u32) -> u32 {
    (u64::from(value) * u64::from(percent) / 100) as u32
}
