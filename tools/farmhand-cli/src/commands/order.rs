//! Queue a render.

use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use farmhand_order_model::Toggle;
use farmhand_render_engine::pack::dir_size_mb;
use farmhand_render_engine::{place_order, OrderRequest};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::current_project;

/// Named output sizes accepted by `--resolution`.
const RESOLUTION_PRESETS: &[(&str, (u32, u32))] = &[
    ("uhd", (3840, 2160)),
    ("hd", (1920, 1080)),
    ("dcp4k", (4096, 1716)),
    ("dcp2k", (2048, 858)),
];

#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Scene file to render (.blend)
    pub source: PathBuf,

    /// Output directory (defaults to the scene's own output path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Renderer target from the project config
    #[arg(short, long)]
    pub target: Option<String>,

    /// Frame range as START:END, or END to start at frame 1
    #[arg(short, long, value_parser = parse_frames)]
    pub frames: Option<(u32, u32)>,

    /// Output size as WIDTHxHEIGHT or a preset: uhd, hd, dcp4k, dcp2k
    #[arg(short, long, value_parser = parse_resolution)]
    pub resolution: Option<(u32, u32)>,

    /// Force overwriting existing frames: yes|no
    #[arg(long, default_value = "unspecified")]
    pub overwrite: Toggle,

    /// Force placeholder frames: yes|no
    #[arg(long, default_value = "unspecified")]
    pub placeholders: Toggle,

    /// Pack the scene and its dependencies into the queue
    #[arg(long)]
    pub cache: bool,

    /// Replace the order with this name instead of picking a new one
    #[arg(long)]
    pub replace: Option<String>,
}

pub async fn run(args: OrderArgs) -> anyhow::Result<()> {
    let project = current_project()?;
    println!("Creating order for {}", args.source.display());

    let request = OrderRequest {
        source: args.source,
        output: args.output,
        target: args.target,
        frames: args.frames,
        resolution: args.resolution,
        overwrite: args.overwrite,
        use_placeholders: args.placeholders,
        cache: args.cache,
        replace: args.replace,
    };

    if request.cache {
        println!("  Packing dependencies...");
    }

    let mut rng = StdRng::from_entropy();
    let order = place_order(&project, &request, &mut rng, Utc::now())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to place order: {e}"))?;

    println!("Order '{}' queued:", order.name());
    println!("  Source:       {}", order.source_path);
    println!("  Output:       {}", order.output_path);
    println!("  Target:       {}", order.renderer_target);
    println!("  Frames:       {}-{}", order.frame_start, order.frame_end);
    if order.has_resolution_override() {
        println!("  Resolution:   {}x{}", order.resolution_x, order.resolution_y);
    }
    println!("  Overwrite:    {}", order.overwrite);
    println!("  Placeholders: {}", order.use_placeholders);

    if order.is_cached() {
        let packed = project.root.join(&order.target_path);
        if let Some(dir) = packed.parent() {
            match dir_size_mb(dir) {
                Ok(size) => println!("  Cached:       {} ({size:.1} MB)", order.target_path),
                Err(e) => tracing::warn!(error = %e, "Could not measure packed order"),
            }
        }
    }

    Ok(())
}

/// `START:END`, or `END` with an implied start of 1.
fn parse_frames(value: &str) -> Result<(u32, u32), String> {
    let number = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|_| format!("'{s}' is not a frame number"))
    };

    let (start, end) = match value.split_once(':') {
        Some((start, end)) => (number(start)?, number(end)?),
        None => (1, number(value)?),
    };
    if end < start {
        return Err(format!("frame range ends before it starts ({start}:{end})"));
    }
    Ok((start, end))
}

/// `WIDTHxHEIGHT` or a named preset.
fn parse_resolution(value: &str) -> Result<(u32, u32), String> {
    let lowered = value.to_ascii_lowercase();
    if let Some((_, size)) = RESOLUTION_PRESETS.iter().find(|(name, _)| *name == lowered) {
        return Ok(*size);
    }

    let (x, y) = lowered
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT or a preset, got '{value}'"))?;
    let x: u32 = x.trim().parse().map_err(|_| format!("bad width in '{value}'"))?;
    let y: u32 = y.trim().parse().map_err(|_| format!("bad height in '{value}'"))?;
    if x == 0 || y == 0 {
        return Err(format!("resolution must be non-zero, got '{value}'"));
    }
    Ok((x, y))
}
