//! Caching a scene and its dependencies inside an order directory.
//!
//! Packing is delegated to Blender Asset Tracer (`bat pack`), which copies
//! the scene plus every linked library and texture into the destination and
//! rewrites paths to match.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{RenderError, RenderResult};

/// Executable name of the asset packer.
pub const PACKER_PROGRAM: &str = "bat";

/// Pack `source` into `destination` and return the packed scene path.
pub async fn pack_source(source: &Path, destination: &Path) -> RenderResult<PathBuf> {
    let packer = which::which(PACKER_PROGRAM).map_err(|_| RenderError::PackerUnavailable)?;

    tokio::fs::create_dir_all(destination)
        .await
        .map_err(|e| RenderError::io(destination, e))?;

    tracing::info!(
        source = %source.display(),
        destination = %destination.display(),
        "Packing source"
    );

    let status = Command::new(&packer)
        .arg("pack")
        .arg(source)
        .arg(destination)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .await
        .map_err(|source| RenderError::Spawn {
            program: packer.clone(),
            source,
        })?;

    if !status.success() {
        return Err(RenderError::PackerFailed {
            status: status.to_string(),
        });
    }

    let file_name = source.file_name().ok_or_else(|| RenderError::InvalidSource {
        path: source.to_path_buf(),
        reason: "no file name".to_string(),
    })?;
    Ok(destination.join(file_name))
}

/// Total size of all files under `path`, in megabytes.
pub fn dir_size_mb(path: &Path) -> std::io::Result<f64> {
    fn walk(dir: &Path) -> std::io::Result<u64> {
        let mut total = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            total += if meta.is_dir() {
                walk(&entry.path())?
            } else {
                meta.len()
            };
        }
        Ok(total)
    }

    Ok(walk(path)? as f64 / (1024.0 * 1024.0))
}
