//! Render the queue on this host.

use std::io::Write;
use std::sync::Arc;

use farmhand_common::config::{AppConfig, FatalPolicy};
use farmhand_common::host_identity;
use farmhand_render_engine::{MonitorOptions, QueueCallback, QueueDriver, QueueEvent};

use super::current_project;

pub async fn run(app_config: &AppConfig, kill_on_fatal: bool) -> anyhow::Result<()> {
    let project = current_project()?;
    let identity = host_identity(app_config)?;

    let mut options = MonitorOptions::from(&app_config.monitor);
    if kill_on_fatal {
        options.fatal_policy = FatalPolicy::Kill;
    }

    println!("Rendering queue at: {}", project.root.display());
    println!("  Host: {identity}");

    let printer: QueueCallback = Arc::new(print_event);
    let report = QueueDriver::new(project, identity)
        .with_options(options)
        .with_events(printer)
        .drain()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load queue: {e}"))?;

    println!();
    println!(
        "Queue finished: {} complete, {} failed, {} on other hosts, {} already done",
        report.completed.len(),
        report.failed.len(),
        report.skipped_held.len(),
        report.already_complete,
    );
    for (name, error) in &report.failed {
        println!("  {name}: {error}");
    }

    Ok(())
}

fn print_event(event: QueueEvent) {
    match event {
        QueueEvent::Started { order, scene } => {
            println!("[{order}] {scene}");
        }
        QueueEvent::Progress { update, .. } => {
            let percent = update
                .percent
                .map(|p| format!("{p:>3}% "))
                .unwrap_or_default();
            print!(
                "\r  {percent}Frame {} ({}) {}    ",
                update.frame,
                update.phase,
                update.elapsed.as_deref().unwrap_or(""),
            );
            let _ = std::io::stdout().flush();
        }
        QueueEvent::Fatal { order, kind } => {
            println!("\n  [{order}] renderer reported: {kind}");
        }
        QueueEvent::Completed { order } => {
            println!("\n  [{order}] done");
        }
        QueueEvent::Failed { order, reason } => {
            println!("\n  [{order}] failed: {reason}");
        }
        QueueEvent::SkippedHeld { order, holder } => {
            println!("[{order}] claimed by {holder}, skipping");
        }
    }
}
