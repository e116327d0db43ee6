//! Draining a project's queue on this host.
//!
//! Orders are attempted strictly oldest-first and one at a time. Several
//! hosts may drain the same project concurrently; they coordinate only
//! through claim markers. A failure in one order never stops the drain.

use std::sync::Arc;

use farmhand_common::LoadedProject;
use farmhand_order_model::{ClaimOutcome, Order, OrderStore};

use crate::classify::RenderErrorKind;
use crate::command::build_invocation;
use crate::error::{RenderError, RenderResult};
use crate::monitor::{run_render, EventCallback, MonitorEvent, MonitorOptions};
use crate::progress::{FrameWindow, ProgressUpdate};

/// Observable steps of a queue drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    Started { order: String, scene: String },
    Progress { order: String, update: ProgressUpdate },
    Fatal { order: String, kind: RenderErrorKind },
    Completed { order: String },
    Failed { order: String, reason: String },
    SkippedHeld { order: String, holder: String },
}

/// Callback for queue events.
pub type QueueCallback = Arc<dyn Fn(QueueEvent) + Send + Sync>;

/// What happened to each order during one drain.
#[derive(Debug, Default)]
pub struct QueueReport {
    pub completed: Vec<String>,
    pub failed: Vec<(String, RenderError)>,
    pub skipped_held: Vec<(String, String)>,
    pub already_complete: usize,
}

impl QueueReport {
    /// Number of orders this host attempted.
    pub fn attempted(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

/// Renders every claimable order in a project.
pub struct QueueDriver {
    project: LoadedProject,
    store: OrderStore,
    identity: String,
    options: MonitorOptions,
    on_event: Option<QueueCallback>,
}

impl QueueDriver {
    pub fn new(project: LoadedProject, identity: impl Into<String>) -> Self {
        let store = OrderStore::new(&project.root);
        Self {
            project,
            store,
            identity: identity.into(),
            options: MonitorOptions::default(),
            on_event: None,
        }
    }

    pub fn with_options(mut self, options: MonitorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_events(mut self, on_event: QueueCallback) -> Self {
        self.on_event = Some(on_event);
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Attempt every incomplete order once, oldest first.
    ///
    /// Only a failure to load the queue is returned as an error. Per-order
    /// failures are recorded in the report and the drain moves on.
    pub async fn drain(&self) -> RenderResult<QueueReport> {
        let orders = self.store.load_all()?;
        let mut report = QueueReport::default();

        tracing::info!(
            host = %self.identity,
            orders = orders.len(),
            "Draining queue"
        );

        for mut queued in orders {
            let name = queued.name().to_string();

            if queued.complete {
                report.already_complete += 1;
                continue;
            }

            match self.store.try_claim(&mut queued, &self.identity) {
                Ok(ClaimOutcome::HeldByOther(holder)) => {
                    tracing::info!(order = %name, holder = %holder, "Order held by another host");
                    self.emit(QueueEvent::SkippedHeld {
                        order: name.clone(),
                        holder: holder.clone(),
                    });
                    report.skipped_held.push((name, holder));
                    continue;
                }
                Ok(ClaimOutcome::AlreadyOwnedBySelf) => {
                    tracing::info!(order = %name, "Resuming order already claimed by this host");
                }
                Ok(ClaimOutcome::Acquired) => {}
                Err(e) => {
                    self.record_failure(&mut report, name, e.into());
                    continue;
                }
            }

            // The snapshot may be stale: another host can finish an order
            // while this one is busy rendering an earlier one.
            let mut order = match self.store.load(&name) {
                Ok(fresh) => fresh,
                Err(e) => {
                    if let Err(release) = self.store.release(&mut queued) {
                        tracing::warn!(order = %name, error = %release, "Failed to release claim");
                    }
                    self.record_failure(&mut report, name, e.into());
                    continue;
                }
            };
            if order.complete {
                tracing::info!(order = %name, "Order was completed by another host");
                if let Err(e) = self.store.release(&mut order) {
                    tracing::warn!(order = %name, error = %e, "Failed to release claim");
                }
                report.already_complete += 1;
                continue;
            }

            let result = self.process(&mut order).await;

            if let Err(e) = self.store.release(&mut order) {
                tracing::warn!(order = %name, error = %e, "Failed to release claim");
            }

            match result {
                Ok(()) => {
                    tracing::info!(order = %name, "Order complete");
                    self.emit(QueueEvent::Completed {
                        order: name.clone(),
                    });
                    report.completed.push(name);
                }
                Err(e) => self.record_failure(&mut report, name, e),
            }
        }

        tracing::info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped_held.len(),
            "Queue drained"
        );
        Ok(report)
    }

    /// Render a claimed order and persist its outcome.
    ///
    /// The manifest is written before the claim is dropped so no other host
    /// can pick the order up between the two.
    async fn process(&self, order: &mut Order) -> RenderResult<()> {
        let invocation = build_invocation(&self.project, order)?;
        self.emit(QueueEvent::Started {
            order: order.name().to_string(),
            scene: invocation.scene_file().unwrap_or_default().to_string(),
        });

        let window = FrameWindow::new(order.frame_start, order.frame_count());
        let rendered = run_render(
            &invocation,
            window,
            self.options,
            self.monitor_callback(order.name()),
        )
        .await;

        order.complete = rendered.is_ok();
        self.store.persist(order)?;
        rendered
    }

    fn monitor_callback(&self, order: &str) -> Option<EventCallback> {
        let sink = self.on_event.clone()?;
        let order = order.to_string();
        Some(Arc::new(move |event: MonitorEvent| {
            let event = match event {
                MonitorEvent::Progress(update) => QueueEvent::Progress {
                    order: order.clone(),
                    update,
                },
                MonitorEvent::Fatal(kind) => QueueEvent::Fatal {
                    order: order.clone(),
                    kind,
                },
            };
            sink(event);
        }))
    }

    fn record_failure(&self, report: &mut QueueReport, name: String, error: RenderError) {
        tracing::error!(order = %name, error = %error, "Order failed");
        self.emit(QueueEvent::Failed {
            order: name.clone(),
            reason: error.to_string(),
        });
        report.failed.push((name, error));
    }

    fn emit(&self, event: QueueEvent) {
        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }
}
