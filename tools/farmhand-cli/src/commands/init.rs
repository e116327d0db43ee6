//! Initialize a new Farmhand project.

use std::path::PathBuf;

use farmhand_common::project::{CONFIG_PATH, ORDERS_DIR};
use farmhand_common::LoadedProject;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Creating project at {}", path.display());

    let project = LoadedProject::init(&path)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  Directory: {}", project.root.display());
    println!("  Config:    {CONFIG_PATH}");
    println!("  Queue:     {ORDERS_DIR}/");
    println!();
    println!("Edit the [[target]] entries in {CONFIG_PATH} to point at your Blender installs.");

    Ok(())
}
