//! Show the queue.

use std::path::Path;

use farmhand_order_model::{Order, OrderStore};

use super::current_project;

pub fn run() -> anyhow::Result<()> {
    let project = current_project()?;
    let orders = OrderStore::new(&project.root).load_all()?;

    if orders.is_empty() {
        println!("Queue is empty");
        return Ok(());
    }

    for (i, order) in orders.iter().enumerate() {
        println!(
            "{:>3}  {:<6} {:<28} {:>11}  {:<10} {}",
            i + 1,
            order.name(),
            file_name(&order.source_path),
            frames(order),
            if order.renderer_target.is_empty() {
                "default"
            } else {
                order.renderer_target.as_str()
            },
            status(order),
        );
    }
    Ok(())
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

fn frames(order: &Order) -> String {
    if order.frame_end == 0 {
        "scene".to_string()
    } else {
        format!("{}-{}", order.frame_start, order.frame_end)
    }
}

fn status(order: &Order) -> String {
    match (order.complete, order.lock()) {
        (true, _) => "complete".to_string(),
        (false, Some(host)) => format!("rendering on {host}"),
        (false, None) if order.is_cached() => "pending (cached)".to_string(),
        (false, None) => "pending".to_string(),
    }
}
