//! Re-queue an order.

use chrono::Utc;
use farmhand_order_model::OrderStore;

use super::current_project;

pub fn run(name: String) -> anyhow::Result<()> {
    let project = current_project()?;
    let store = OrderStore::new(&project.root);

    let order = store.reset(&name, Utc::now())?;
    println!("Order '{}' re-queued at the back of the queue", order.name());
    Ok(())
}
