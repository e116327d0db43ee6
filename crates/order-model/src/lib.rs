//! Farmhand Order Model
//!
//! The on-disk render queue shared by every host working on a project:
//! - **Order:** one render's parameters and completion state (`order.toml`)
//! - **Store:** loading the queue oldest-first, persisting, maintenance
//! - **Claims:** `lock.txt` markers naming the host rendering an order
//! - **Names:** short word identifiers drawn from a caller-supplied RNG

pub mod claim;
pub mod error;
pub mod name;
pub mod order;
pub mod store;

pub use claim::*;
pub use error::*;
pub use order::*;
pub use store::*;
