pub mod clean;
pub mod delete;
pub mod init;
pub mod list;
pub mod order;
pub mod redo;
pub mod render;
pub mod targets;

use farmhand_common::LoadedProject;

/// The project enclosing the working directory.
pub fn current_project() -> anyhow::Result<LoadedProject> {
    let cwd = std::env::current_dir()?;
    LoadedProject::discover(&cwd).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}
