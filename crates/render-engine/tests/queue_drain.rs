//! End-to-end queue drains against fake renderers.
//!
//! Each fake renderer is a small shell script registered as a target in the
//! project config. They ignore their arguments and print canned output.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use farmhand_common::config::FatalPolicy;
use farmhand_common::project::lock_path;
use farmhand_common::LoadedProject;
use farmhand_order_model::{Order, OrderStore};
use farmhand_render_engine::{
    MonitorOptions, QueueDriver, QueueEvent, RenderError, RenderErrorKind, RenderPhase,
};

const GOOD: &str = r#"echo "Blender 4.2.0"
echo "Fra:1 Mem:10.00M (Peak 10.00M) | Time:00:00.10 | Syncing Cube"
echo "Fra:2 Mem:10.00M (Peak 10.00M) | Time:00:00.20 | Compositing | Tile 1-1"
echo "Saved: 'out_0002.png'"
exit 0"#;

const OUT_OF_MEMORY: &str = r#"echo "Fra:1 Mem:10.00M (Peak 10.00M) | Time:00:00.10 | Syncing Cube"
echo "Error: std::bad_alloc"
echo "Fra:2 Mem:10.00M (Peak 10.00M) | Time:00:00.20"
exit 1"#;

fn fake_renderer(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// A fresh project with the given fake renderers registered as targets.
fn project_with(targets: &[(&str, &str)]) -> (tempfile::TempDir, LoadedProject) {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();

    let mut project = LoadedProject::init(dir.path()).unwrap();
    for (name, body) in targets {
        let script = fake_renderer(&bin, name, body);
        project
            .config
            .add_target(*name, script.to_string_lossy().into_owned());
    }
    project.save_config().unwrap();

    let project = LoadedProject::discover(dir.path()).unwrap();
    (dir, project)
}

fn queue(store: &OrderStore, orders: &[(&str, &str)]) {
    for (i, (name, target)) in orders.iter().enumerate() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, i as u32).unwrap();
        let mut order = Order::new(*name, "shots/scene.blend", created);
        order.renderer_target = target.to_string();
        order.frame_start = 1;
        order.frame_end = 3;
        store.persist(&order).unwrap();
    }
}

fn options(fatal_policy: FatalPolicy) -> MonitorOptions {
    MonitorOptions {
        startup_grace: Duration::ZERO,
        fatal_policy,
    }
}

fn recorder() -> (Arc<Mutex<Vec<QueueEvent>>>, Arc<dyn Fn(QueueEvent) + Send + Sync>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    (
        events,
        Arc::new(move |e: QueueEvent| sink.lock().unwrap().push(e)),
    )
}

#[tokio::test]
async fn test_failed_order_does_not_stop_the_queue() {
    let (_dir, project) = project_with(&[("good", GOOD), ("oom", OUT_OF_MEMORY)]);
    let store = OrderStore::new(&project.root);
    queue(&store, &[("ash", "good"), ("bay", "oom"), ("cod", "good")]);

    let (events, sink) = recorder();
    let report = QueueDriver::new(project.clone(), "render-01")
        .with_options(options(FatalPolicy::LetExit))
        .with_events(sink)
        .drain()
        .await
        .unwrap();

    assert_eq!(report.completed, vec!["ash".to_string(), "cod".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "bay");
    assert_eq!(report.failed[0].1.kind(), Some(RenderErrorKind::NoMemory));

    let reloaded = store.load_all().unwrap();
    let state: Vec<_> = reloaded
        .iter()
        .map(|o| (o.name().to_string(), o.complete, o.lock().map(str::to_string)))
        .collect();
    assert_eq!(
        state,
        vec![
            ("ash".to_string(), true, None),
            ("bay".to_string(), false, None),
            ("cod".to_string(), true, None),
        ]
    );
    assert!(!lock_path(&project.root, "bay").exists());

    let events = events.lock().unwrap();
    let started: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            QueueEvent::Started { order, .. } => Some(order.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec!["ash", "bay", "cod"]);

    assert!(events.iter().any(|e| matches!(
        e,
        QueueEvent::Progress { order, update }
            if order == "ash" && update.phase == RenderPhase::Composite && update.percent == Some(50)
    )));
    assert!(events.contains(&QueueEvent::Fatal {
        order: "bay".to_string(),
        kind: RenderErrorKind::NoMemory,
    }));
}

#[tokio::test]
async fn test_second_drain_skips_completed_orders() {
    let (_dir, project) = project_with(&[("good", GOOD)]);
    let store = OrderStore::new(&project.root);
    queue(&store, &[("ash", "good"), ("bay", "good")]);

    let driver = QueueDriver::new(project, "render-01").with_options(options(FatalPolicy::LetExit));
    let first = driver.drain().await.unwrap();
    assert_eq!(first.completed.len(), 2);

    let second = driver.drain().await.unwrap();
    assert_eq!(second.attempted(), 0);
    assert_eq!(second.already_complete, 2);
}

#[tokio::test]
async fn test_fatal_line_with_clean_exit_still_fails() {
    let body = "echo \"Warning: Cycles is not enabled!\"\nexit 0";
    let (_dir, project) = project_with(&[("nocycles", body)]);
    let store = OrderStore::new(&project.root);
    queue(&store, &[("ash", "nocycles")]);

    let report = QueueDriver::new(project, "render-01")
        .with_options(options(FatalPolicy::LetExit))
        .drain()
        .await
        .unwrap();

    assert_eq!(
        report.failed[0].1.kind(),
        Some(RenderErrorKind::RendererNotSupported)
    );
    assert!(!store.load("ash").unwrap().complete);
}

#[tokio::test]
async fn test_kill_policy_stops_renderer_early() {
    let body = "echo \"CUDA error: launch failed\"\nexec sleep 30";
    let (_dir, project) = project_with(&[("hang", body)]);
    let store = OrderStore::new(&project.root);
    queue(&store, &[("ash", "hang")]);

    let driver = QueueDriver::new(project, "render-01").with_options(options(FatalPolicy::Kill));
    let report = tokio::time::timeout(Duration::from_secs(15), driver.drain())
        .await
        .expect("kill policy should not wait for the renderer to exit")
        .unwrap();

    assert_eq!(
        report.failed[0].1.kind(),
        Some(RenderErrorKind::RendererCrash)
    );
    assert_eq!(store.read_lock("ash").unwrap(), None);
}

#[tokio::test]
async fn test_unclassified_failure_carries_stderr() {
    let body = "echo \"Fra:1 Mem:1M\"\necho \"segfault in module\" >&2\nexit 3";
    let (_dir, project) = project_with(&[("crashy", body)]);
    let store = OrderStore::new(&project.root);
    queue(&store, &[("ash", "crashy")]);

    let report = QueueDriver::new(project, "render-01")
        .with_options(options(FatalPolicy::LetExit))
        .drain()
        .await
        .unwrap();

    match &report.failed[0].1 {
        RenderError::Unclassified { stderr_tail, .. } => {
            assert!(stderr_tail.contains("segfault in module"));
        }
        other => panic!("expected unclassified failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_renderer_releases_claim() {
    let (dir, mut project) = project_with(&[]);
    project
        .config
        .add_target("gone", dir.path().join("bin/missing").to_string_lossy().into_owned());
    let store = OrderStore::new(&project.root);
    queue(&store, &[("ash", "gone")]);

    let report = QueueDriver::new(project, "render-01")
        .with_options(options(FatalPolicy::LetExit))
        .drain()
        .await
        .unwrap();

    assert!(matches!(report.failed[0].1, RenderError::Spawn { .. }));
    let order = store.load("ash").unwrap();
    assert!(!order.complete);
    assert_eq!(order.lock(), None);
}

#[tokio::test]
async fn test_resumes_order_claimed_by_same_host() {
    let (_dir, project) = project_with(&[("good", GOOD)]);
    let store = OrderStore::new(&project.root);
    queue(&store, &[("ash", "good")]);
    std::fs::write(lock_path(&project.root, "ash"), "render-01").unwrap();

    let report = QueueDriver::new(project, "render-01")
        .with_options(options(FatalPolicy::LetExit))
        .drain()
        .await
        .unwrap();

    assert_eq!(report.completed, vec!["ash".to_string()]);
    assert_eq!(store.read_lock("ash").unwrap(), None);
}

#[tokio::test]
async fn test_fatal_inside_status_line_fails_the_order() {
    let body = r#"echo "Fra:1 Mem:10.00M (Peak 12.00M) | Time:00:02.10 | Scene, ViewLayer | CUDA error: Out of memory in cuMemAlloc_v2(&device_pointer, size)"
exit 0"#;
    let (_dir, project) = project_with(&[("gpu", body)]);
    let store = OrderStore::new(&project.root);
    queue(&store, &[("ash", "gpu")]);

    let (events, sink) = recorder();
    let report = QueueDriver::new(project, "render-01")
        .with_options(options(FatalPolicy::LetExit))
        .with_events(sink)
        .drain()
        .await
        .unwrap();

    assert!(report.completed.is_empty());
    assert_eq!(
        report.failed[0].1.kind(),
        Some(RenderErrorKind::NoVideoMemory)
    );
    assert!(!store.load("ash").unwrap().complete);

    let events = events.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, QueueEvent::Progress { update, .. } if update.frame == 1)));
}

#[tokio::test]
async fn test_order_finished_elsewhere_is_not_rendered_again() {
    // While rendering `ash`, another host finishes `bay` and drops its claim.
    let finish_bay = r#"echo ash >> runs.txt
m=.farmhand/orders/bay/order.toml
sed 's/^complete = false/complete = true/' "$m" > "$m.edit" && mv "$m.edit" "$m"
exit 0"#;
    let record_bay = "echo bay >> runs.txt\nexit 0";
    let (_dir, project) = project_with(&[("first", finish_bay), ("second", record_bay)]);
    let store = OrderStore::new(&project.root);
    queue(&store, &[("ash", "first"), ("bay", "second")]);

    let report = QueueDriver::new(project.clone(), "render-01")
        .with_options(options(FatalPolicy::LetExit))
        .drain()
        .await
        .unwrap();

    assert_eq!(report.completed, vec!["ash".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(report.already_complete, 1);

    let runs = std::fs::read_to_string(project.root.join("runs.txt")).unwrap();
    assert_eq!(runs, "ash\n");
    let bay = store.load("bay").unwrap();
    assert!(bay.complete);
    assert_eq!(bay.lock(), None);
}
