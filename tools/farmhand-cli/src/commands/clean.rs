//! Remove finished orders.

use farmhand_order_model::OrderStore;

use super::current_project;

pub fn run(hard: bool) -> anyhow::Result<()> {
    let project = current_project()?;
    let removed = OrderStore::new(&project.root).clean(hard)?;

    if removed.is_empty() {
        println!("Nothing to clean");
        return Ok(());
    }
    for name in &removed {
        println!("  removed {name}");
    }
    println!("Removed {} order(s)", removed.len());
    Ok(())
}
