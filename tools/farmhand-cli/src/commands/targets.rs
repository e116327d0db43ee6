//! List or register renderer targets.

use super::current_project;

pub fn run(name: Option<String>, path: Option<String>) -> anyhow::Result<()> {
    let mut project = current_project()?;

    if let (Some(name), Some(path)) = (name, path) {
        if project.config.add_target(&name, &path) {
            project
                .save_config()
                .map_err(|e| anyhow::anyhow!("Failed to save config: {e}"))?;
            println!("Registered target '{name}'");
        } else {
            println!("Target '{name}' is already registered with that path");
        }
        return Ok(());
    }

    println!("Targets ({}):", project.config_path.display());
    if project.config.targets.is_empty() {
        println!("  (none)");
    }
    for target in &project.config.targets {
        let marker = if target.name == project.config.default_target {
            "*"
        } else {
            " "
        };
        println!("  {marker} {:<8} {}", target.name, target.path);
    }
    Ok(())
}
