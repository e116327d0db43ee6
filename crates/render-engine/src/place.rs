//! Turning an operator request into a queued order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use farmhand_common::project::ORDERS_DIR;
use farmhand_common::{FarmhandError, LoadedProject};
use farmhand_order_model::{Order, OrderStore, Toggle, PROJECT_DEFAULT_OUTPUT};
use rand::Rng;

use crate::command::resolve_target;
use crate::error::{RenderError, RenderResult};
use crate::pack::pack_source;
use crate::probe::{probe_source, SourceInfo};

/// File extension a source scene must have.
pub const SOURCE_EXTENSION: &str = "blend";

/// Everything an operator can specify when queueing a render.
#[derive(Debug, Clone, Default)]
pub struct OrderRequest {
    /// Scene to render. Relative paths resolve against the working directory.
    pub source: PathBuf,
    /// Output directory. `None` keeps the scene's own output settings.
    pub output: Option<PathBuf>,
    /// Logical renderer target. `None` uses the project default.
    pub target: Option<String>,
    /// Inclusive frame range; probed from the scene when absent.
    pub frames: Option<(u32, u32)>,
    /// Output size; probed from the scene when absent.
    pub resolution: Option<(u32, u32)>,
    pub overwrite: Toggle,
    pub use_placeholders: Toggle,
    /// Pack the scene and its dependencies into the order directory.
    pub cache: bool,
    /// Reuse this name, replacing any existing order with it.
    pub replace: Option<String>,
}

/// Validate `request`, fill in anything left to the scene, and persist the
/// new order.
pub async fn place_order<R>(
    project: &LoadedProject,
    request: &OrderRequest,
    rng: &mut R,
    now: DateTime<Utc>,
) -> RenderResult<Order>
where
    R: Rng + ?Sized,
{
    let store = OrderStore::new(&project.root);
    let root = canonical(&project.root)?;
    let source = validate_source(&request.source)?;

    let target = request
        .target
        .clone()
        .unwrap_or_else(|| project.config.default_target.clone());
    let renderer = resolve_target(&project.config, &target)?;

    let name = match &request.replace {
        Some(name) => {
            validate_name(name)?;
            name.clone()
        }
        None => store.allocate_name(rng)?,
    };

    let probed = if request.frames.is_none() || request.resolution.is_none() {
        probe_source(&renderer, &source).await?
    } else {
        SourceInfo::default()
    };
    let (frame_start, frame_end) = request
        .frames
        .unwrap_or((probed.frame_start, probed.frame_end));
    let (resolution_x, resolution_y) = request
        .resolution
        .unwrap_or((probed.resolution_x, probed.resolution_y));

    let mut order = Order::new(name.clone(), relative_to(&source, &root), now);
    order.renderer_target = target;
    order.frame_start = frame_start;
    order.frame_end = frame_end;
    order.resolution_x = resolution_x;
    order.resolution_y = resolution_y;
    order.overwrite = request.overwrite;
    order.use_placeholders = request.use_placeholders;
    order.output_path = match &request.output {
        Some(output) => relative_to(&absolute(output)?, &root),
        None => PROJECT_DEFAULT_OUTPUT.to_string(),
    };
    order
        .validate()
        .map_err(|message| FarmhandError::config(format!("order '{name}': {message}")))?;

    if request.replace.is_some() && store.order_dir(&name).exists() {
        tracing::info!(order = %name, "Replacing existing order");
        store.remove(&name)?;
    }

    if request.cache {
        let staging = store.orders_dir().join(format!(".{name}.staging"));
        if staging.exists() {
            std::fs::remove_dir_all(&staging).map_err(|e| RenderError::io(&staging, e))?;
        }
        let packed = match pack_source(&source, &staging).await {
            Ok(packed) => packed,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&staging);
                return Err(e);
            }
        };
        let file_name = packed.file_name().unwrap_or_default().to_string_lossy();
        order.target_path = format!("{ORDERS_DIR}/{name}/{file_name}");
        if let Err(e) = store.adopt(&order, &staging) {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e.into());
        }
    } else {
        store.create(&order)?;
    }
    tracing::info!(
        order = %name,
        source = %order.source_path,
        frames = ?(order.frame_start, order.frame_end),
        cached = order.is_cached(),
        "Order placed"
    );
    Ok(order)
}

fn validate_source(path: &Path) -> RenderResult<PathBuf> {
    let invalid = |reason: &str| RenderError::InvalidSource {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
        return Err(invalid("not a .blend file"));
    }
    match path.canonicalize() {
        Ok(resolved) if resolved.is_file() => Ok(resolved),
        Ok(_) => Err(invalid("not a file")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(invalid("file does not exist")),
        Err(e) => Err(RenderError::io(path, e)),
    }
}

fn validate_name(name: &str) -> RenderResult<()> {
    let plain = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if plain {
        Ok(())
    } else {
        Err(FarmhandError::config(format!("'{name}' is not a usable order name")).into())
    }
}

fn canonical(path: &Path) -> RenderResult<PathBuf> {
    path.canonicalize().map_err(|e| RenderError::io(path, e))
}

fn absolute(path: &Path) -> RenderResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| RenderError::io(path, e))?;
    Ok(cwd.join(path))
}

/// `path` relative to `root` with forward slashes, or absolute when it lies
/// outside the project.
fn relative_to(path: &Path, root: &Path) -> String {
    let shown = match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => Path::new(PROJECT_DEFAULT_OUTPUT),
        Ok(rel) => rel,
        Err(_) => path,
    };
    shown.to_string_lossy().replace('\\', "/")
}
