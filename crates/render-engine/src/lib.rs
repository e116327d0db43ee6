//! Farmhand Render Engine
//!
//! Runs queued orders through an external renderer and decides how each
//! run ended.
//!
//! # Pipeline Architecture
//!
//! ```text
//! .farmhand/orders/ ──load_all──► oldest-first queue
//!                                        │
//!                                  try_claim (lock.txt)
//!                                        │
//! config.toml targets ──────────► build_invocation
//!                                        │
//!                                  run_render ──► stdout lines ──┬── progress
//!                                        │                       └── classify
//!                                        ▼
//!                         persist(complete) ──► release
//! ```

pub mod classify;
pub mod command;
pub mod error;
pub mod monitor;
pub mod pack;
pub mod place;
pub mod probe;
pub mod progress;
pub mod queue;

pub use classify::{classify, RenderErrorKind};
pub use command::{build_invocation, RenderInvocation};
pub use error::*;
pub use monitor::{run_render, MonitorEvent, MonitorOptions};
pub use place::{place_order, OrderRequest};
pub use progress::{ProgressUpdate, RenderPhase};
pub use queue::*;
