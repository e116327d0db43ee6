//! Running one renderer process and watching its output.
//!
//! ```text
//! Starting ──spawn──► Streaming ──exit──► Succeeded | Failed
//!     │                   │
//!     └─spawn error       └─fatal line (Kill policy) ──► kill ──► Failed
//! ```
//!
//! A reader task owns the child's stdout. It parses progress, classifies
//! each line, and returns the first fatal classification when the pipe
//! closes. The run's result is decided only after both the process has
//! exited and the reader has been joined.

use std::collections::VecDeque;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use farmhand_common::config::{FatalPolicy, MonitorConfig};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;

use crate::classify::{classify, RenderErrorKind};
use crate::command::RenderInvocation;
use crate::error::{RenderError, RenderResult};
use crate::progress::{parse_progress, FrameWindow, ProgressUpdate};

/// Lines of renderer stderr kept for unclassified failure messages.
const STDERR_TAIL_LINES: usize = 8;

/// How a run is watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Delay before the reader starts consuming stdout.
    pub startup_grace: Duration,
    pub fatal_policy: FatalPolicy,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for MonitorOptions {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            startup_grace: Duration::from_millis(config.startup_grace_ms),
            fatal_policy: config.fatal_policy,
        }
    }
}

/// Something the monitor observed in the renderer's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Progress(ProgressUpdate),
    Fatal(RenderErrorKind),
}

/// Callback for monitor events. Invoked from the reader task.
pub type EventCallback = Arc<dyn Fn(MonitorEvent) + Send + Sync>;

enum Waited {
    Exited(std::io::Result<ExitStatus>),
    FatalSeen,
}

/// Run `invocation` to completion.
///
/// Returns `Ok(())` only when the renderer exited successfully and printed
/// no fatal signature.
pub async fn run_render(
    invocation: &RenderInvocation,
    window: FrameWindow,
    options: MonitorOptions,
    on_event: Option<EventCallback>,
) -> RenderResult<()> {
    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RenderError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

    tracing::info!(
        pid = child.id(),
        program = %invocation.program.display(),
        "Renderer process started"
    );

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RenderError::Monitor("renderer stdout was not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RenderError::Monitor("renderer stderr was not captured".to_string()))?;

    let (fatal_tx, mut fatal_rx) = oneshot::channel();
    let reader = tokio::spawn(scan_output(
        stdout,
        options.startup_grace,
        window,
        on_event,
        Some(fatal_tx),
    ));
    // Drained concurrently so the renderer never blocks on a full stderr pipe.
    let stderr_task = tokio::spawn(collect_tail(stderr));

    let waited = match options.fatal_policy {
        FatalPolicy::LetExit => Waited::Exited(child.wait().await),
        FatalPolicy::Kill => tokio::select! {
            status = child.wait() => Waited::Exited(status),
            Ok(_) = &mut fatal_rx => Waited::FatalSeen,
        },
    };

    let status = match waited {
        Waited::Exited(status) => status,
        Waited::FatalSeen => {
            tracing::warn!(pid = child.id(), "Killing renderer after fatal output");
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "Failed to signal renderer");
            }
            child.wait().await
        }
    }
    .map_err(|e| RenderError::Monitor(format!("failed to wait on renderer: {e}")))?;

    let fatal = reader
        .await
        .map_err(|e| RenderError::Monitor(format!("output reader failed: {e}")))?;
    let stderr_tail = stderr_task.await.unwrap_or_default();

    tracing::info!(status = %status, fatal = ?fatal, "Renderer process exited");

    match fatal {
        Some(kind) => Err(RenderError::Fatal(kind)),
        None if status.success() => Ok(()),
        None => Err(RenderError::Unclassified {
            status: status.to_string(),
            stderr_tail,
        }),
    }
}

/// Read `output` to the end, emitting progress and returning the first
/// fatal classification.
///
/// After a fatal line the remaining output is drained without being
/// classified.
pub async fn scan_output<R>(
    output: R,
    startup_grace: Duration,
    window: FrameWindow,
    on_event: Option<EventCallback>,
    mut fatal_tx: Option<oneshot::Sender<RenderErrorKind>>,
) -> Option<RenderErrorKind>
where
    R: AsyncRead + Unpin,
{
    if !startup_grace.is_zero() {
        tokio::time::sleep(startup_grace).await;
    }

    let mut reader = BufReader::new(output);
    let mut buf = Vec::new();
    let mut fatal = None;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed reading renderer output");
                break;
            }
        }
        if fatal.is_some() {
            continue;
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end();

        let progress = parse_progress(line, window);
        let is_status = progress.is_some();
        if let (Some(update), Some(cb)) = (progress, &on_event) {
            cb(MonitorEvent::Progress(update));
        }

        // Status lines carry device errors too.
        if let Some(kind) = classify(line) {
            tracing::warn!(code = kind.code(), line, "Fatal renderer output");
            fatal = Some(kind);
            if let Some(cb) = &on_event {
                cb(MonitorEvent::Fatal(kind));
            }
            if let Some(tx) = fatal_tx.take() {
                let _ = tx.send(kind);
            }
        } else if !is_status {
            tracing::trace!(line, "renderer");
        }
    }

    fatal
}

async fn collect_tail<R>(output: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(output).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::debug!(line = %line, "renderer stderr");
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "Stopped reading renderer stderr");
                break;
            }
        }
    }
    Vec::from(tail).join(" | ").trim().to_string()
}
