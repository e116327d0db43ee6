//! Remove an order.

use farmhand_order_model::OrderStore;

use super::current_project;

pub fn run(name: String) -> anyhow::Result<()> {
    let project = current_project()?;
    OrderStore::new(&project.root).remove(&name)?;
    println!("Order '{name}' deleted");
    Ok(())
}
