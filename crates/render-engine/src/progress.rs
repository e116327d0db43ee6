//! Frame progress parsed from renderer status lines.
//!
//! Status lines look like
//! `Fra:12 Mem:98.00M (Peak 130.01M) | Time:00:04.10 | Compositing | Tile 1-1`.
//! Only the frame token is required; everything else is best effort.

use std::fmt;

/// Which stage of a frame the renderer reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Render,
    Composite,
}

impl fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderPhase::Render => f.write_str("render"),
            RenderPhase::Composite => f.write_str("composite"),
        }
    }
}

/// Frame range the percentage is computed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameWindow {
    pub start: u32,
    pub count: u32,
}

impl FrameWindow {
    pub fn new(start: u32, count: u32) -> Self {
        Self { start, count }
    }
}

/// One parsed progress line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Frame number as printed by the renderer.
    pub frame: u32,
    pub phase: RenderPhase,
    /// Renderer's own elapsed-time token, e.g. `00:04.10`.
    pub elapsed: Option<String>,
    /// Percent through the order's range; `None` for single-frame orders.
    pub percent: Option<u32>,
}

/// Parse a renderer line. Returns `None` for anything that is not a
/// frame status line.
pub fn parse_progress(line: &str, window: FrameWindow) -> Option<ProgressUpdate> {
    let rest = line.trim_start().strip_prefix("Fra:")?;
    let token = rest.split_whitespace().next()?;
    let frame: u32 = token.parse().ok()?;

    let phase = if line.contains("Compositing") {
        RenderPhase::Composite
    } else {
        RenderPhase::Render
    };

    let elapsed = line
        .split_once("Time:")
        .and_then(|(_, after)| after.split_whitespace().next())
        .map(str::to_string);

    Some(ProgressUpdate {
        frame,
        phase,
        elapsed,
        percent: percent_complete(frame, window),
    })
}

/// `(frame - start) / count` as a whole percentage, clamped to 0..=100.
pub fn percent_complete(frame: u32, window: FrameWindow) -> Option<u32> {
    if window.count == 0 {
        return None;
    }
    let done = u64::from(frame.saturating_sub(window.start)) * 100;
    Some((done / u64::from(window.count)).min(100) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render_line() {
        let update = parse_progress(
            "Fra:50 Mem:120.44M (Peak 130.01M) | Time:00:01.52 | Syncing Cube",
            FrameWindow::new(1, 99),
        )
        .unwrap();
        assert_eq!(update.frame, 50);
        assert_eq!(update.phase, RenderPhase::Render);
        assert_eq!(update.elapsed.as_deref(), Some("00:01.52"));
        assert_eq!(update.percent, Some(49));
    }

    #[test]
    fn test_parse_composite_line() {
        let update = parse_progress(
            "Fra:7 Mem:98.00M | Time:00:04.10 | Compositing | Tile 1-1",
            FrameWindow::new(1, 10),
        )
        .unwrap();
        assert_eq!(update.phase, RenderPhase::Composite);
        assert_eq!(update.percent, Some(60));
    }

    #[test]
    fn test_single_frame_has_no_percent() {
        let update = parse_progress("Fra:1 Mem:1M", FrameWindow::new(1, 0)).unwrap();
        assert_eq!(update.percent, None);
        assert_eq!(update.elapsed, None);
    }

    #[test]
    fn test_non_progress_lines() {
        let window = FrameWindow::new(1, 10);
        assert!(parse_progress("Saved: 'frame_0001.png'", window).is_none());
        assert!(parse_progress("Fra:", window).is_none());
        assert!(parse_progress("Fra:abc Mem:1M", window).is_none());
        assert!(parse_progress("Time: 00:01.00 Fra:3", window).is_none());
    }

    #[test]
    fn test_percent_bounds() {
        let window = FrameWindow::new(10, 20);
        assert_eq!(percent_complete(5, window), Some(0));
        assert_eq!(percent_complete(10, window), Some(0));
        assert_eq!(percent_complete(30, window), Some(100));
        assert_eq!(percent_complete(45, window), Some(100));
    }
}
