//! Renderer command lines and the startup script injected into them.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use farmhand_common::{FarmhandError, LoadedProject, ProjectConfig};
use farmhand_order_model::{Order, Toggle};

use crate::error::{RenderError, RenderResult};

const RELOCATE_OUTPUT_SCRIPT: &str = include_str!("../assets/relocate_output.py");
const OUTPUT_DIR_TOKEN: &str = "{{OUTPUT_DIR}}";

/// A fully resolved renderer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Project root; the renderer runs from here.
    pub working_dir: PathBuf,
}

impl RenderInvocation {
    /// The scene file handed to the renderer.
    pub fn scene_file(&self) -> Option<&str> {
        self.args.get(1).map(String::as_str)
    }
}

/// Resolve `order`'s renderer and assemble its command line.
///
/// Fails with [`RenderError::TargetNotFound`] before anything is spawned if
/// the order's target is not registered.
pub fn build_invocation(project: &LoadedProject, order: &Order) -> RenderResult<RenderInvocation> {
    let program = resolve_target(&project.config, &order.renderer_target)?;
    let scene = project.root.join(&order.target_path);

    let args = vec![
        "-b".to_string(),
        slash_path(&scene),
        "--python-expr".to_string(),
        startup_script(&project.root, order),
        "-a".to_string(),
    ];

    tracing::debug!(
        order = order.name(),
        program = %program.display(),
        scene = %scene.display(),
        "Built render invocation"
    );

    Ok(RenderInvocation {
        program,
        args,
        working_dir: project.root.clone(),
    })
}

/// Look up a renderer executable by logical target name.
pub fn resolve_target(config: &ProjectConfig, name: &str) -> RenderResult<PathBuf> {
    config.resolve(name).map_err(|e| match e {
        FarmhandError::TargetNotFound { name } => RenderError::TargetNotFound { name },
        other => RenderError::Project(other),
    })
}

/// Python run by the renderer before it starts rendering `order`.
pub fn startup_script(project_root: &Path, order: &Order) -> String {
    let mut script = String::with_capacity(512);
    script.push_str("import bpy\n");
    // Restarted orders must re-render every frame, not skip placeholders
    // left by the interrupted run.
    script.push_str("bpy.context.scene.render.use_placeholder = False\n");

    if order.relocates_output() {
        let output_dir = slash_path(&project_root.join(&order.output_path));
        script.push_str(&RELOCATE_OUTPUT_SCRIPT.replace(OUTPUT_DIR_TOKEN, &py_string(&output_dir)));
        if !script.ends_with('\n') {
            script.push('\n');
        }
    }

    if order.frame_end > 0 {
        let _ = writeln!(script, "bpy.context.scene.frame_start = {}", order.frame_start);
        let _ = writeln!(script, "bpy.context.scene.frame_end = {}", order.frame_end);
    }

    if order.has_resolution_override() {
        let _ = writeln!(script, "bpy.context.scene.render.resolution_x = {}", order.resolution_x);
        let _ = writeln!(script, "bpy.context.scene.render.resolution_y = {}", order.resolution_y);
        script.push_str("bpy.context.scene.render.resolution_percentage = 100\n");
    }

    push_toggle(&mut script, "use_placeholder", order.use_placeholders);
    push_toggle(&mut script, "use_overwrite", order.overwrite);

    script
}

fn push_toggle(script: &mut String, setting: &str, toggle: Toggle) {
    if let Some(value) = toggle.forced() {
        let value = if value { "True" } else { "False" };
        let _ = writeln!(script, "bpy.context.scene.render.{setting} = {value}");
    }
}

fn py_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmhand_common::project::RendererTarget;

    fn project() -> LoadedProject {
        LoadedProject {
            root: PathBuf::from("/srv/show"),
            config_path: PathBuf::from("/srv/show/.farmhand/config.toml"),
            config: ProjectConfig {
                default_target: "4.2".to_string(),
                targets: vec![RendererTarget {
                    name: "4.2".to_string(),
                    path: "/opt/blender-4.2/blender".to_string(),
                }],
            },
        }
    }

    fn order() -> Order {
        let mut order = Order::new("wolf", "shots/sh010.blend", chrono::Utc::now());
        order.frame_start = 1;
        order.frame_end = 100;
        order
    }

    #[test]
    fn test_invocation_layout() {
        let mut order = order();
        order.target_path = ".farmhand/orders/wolf/sh010.blend".to_string();

        let inv = build_invocation(&project(), &order).unwrap();
        assert_eq!(inv.program, PathBuf::from("/opt/blender-4.2/blender"));
        assert_eq!(inv.args.len(), 5);
        assert_eq!(inv.args[0], "-b");
        assert_eq!(
            inv.scene_file(),
            Some("/srv/show/.farmhand/orders/wolf/sh010.blend")
        );
        assert_eq!(inv.args[2], "--python-expr");
        assert_eq!(inv.args[4], "-a");
        assert_eq!(inv.working_dir, PathBuf::from("/srv/show"));
    }

    #[test]
    fn test_unknown_target_fails_before_spawn() {
        let mut order = order();
        order.renderer_target = "2.79".to_string();
        match build_invocation(&project(), &order) {
            Err(RenderError::TargetNotFound { name }) => assert_eq!(name, "2.79"),
            other => panic!("expected TargetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_script_defaults() {
        let script = startup_script(Path::new("/srv/show"), &order());
        assert!(script.starts_with("import bpy\n"));
        assert!(script.contains("use_placeholder = False\n"));
        assert!(script.contains("frame_start = 1\n"));
        assert!(script.contains("frame_end = 100\n"));
        assert!(!script.contains("resolution_x"));
        assert!(!script.contains("use_overwrite"));
        assert!(!script.contains("output_dir"));
        assert_eq!(script.matches("use_placeholder").count(), 1);
    }

    #[test]
    fn test_script_forced_toggles_and_resolution() {
        let mut order = order();
        order.resolution_x = 1920;
        order.resolution_y = 1080;
        order.use_placeholders = Toggle::Yes;
        order.overwrite = Toggle::No;

        let script = startup_script(Path::new("/srv/show"), &order);
        assert!(script.contains("resolution_x = 1920\n"));
        assert!(script.contains("resolution_y = 1080\n"));
        assert!(script.contains("resolution_percentage = 100\n"));
        assert!(script.contains("use_overwrite = False\n"));

        // The forced value comes after the unconditional reset.
        let reset = script.find("use_placeholder = False").unwrap();
        let forced = script.find("use_placeholder = True").unwrap();
        assert!(forced > reset);
    }

    #[test]
    fn test_script_relocates_output() {
        let mut order = order();
        order.output_path = "renders/sh010".to_string();

        let script = startup_script(Path::new("/srv/show"), &order);
        assert!(script.contains("output_dir = \"/srv/show/renders/sh010\""));
        assert!(!script.contains(OUTPUT_DIR_TOKEN));
        assert!(script.contains("frame_start = 1\n"));
    }

    #[test]
    fn test_single_frame_leaves_range_alone() {
        let order = Order::new("wolf", "a.blend", chrono::Utc::now());
        let script = startup_script(Path::new("/srv/show"), &order);
        assert!(!script.contains("frame_start"));
    }

    #[test]
    fn test_py_string_escapes() {
        assert_eq!(py_string(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
