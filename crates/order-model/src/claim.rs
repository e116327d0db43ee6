//! Cooperative claims over orders, shared between hosts through the
//! filesystem.
//!
//! A claim is a `lock.txt` marker inside the order directory whose entire
//! content is the claimant's host identity. The marker only ever appears
//! fully written: the identity is written to a private temp file and then
//! hard-linked into place, which fails if a marker already exists. On
//! filesystems without hard links the marker is created with
//! `create_new`, which is still exclusive but briefly visible empty.
//!
//! An empty marker therefore counts as held until it is older than
//! [`EMPTY_MARKER_GRACE`]. Only then is it treated as left behind by a crash
//! and cleared.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

use farmhand_common::project::lock_path;

use crate::error::{OrderError, OrderResult};
use crate::order::Order;
use crate::store::OrderStore;

/// Age after which an empty claim marker is considered abandoned.
pub const EMPTY_MARKER_GRACE: Duration = Duration::from_secs(60);

/// Result of trying to claim an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The marker was created with our identity.
    Acquired,
    /// The marker already carried our identity (e.g. resuming after a crash).
    AlreadyOwnedBySelf,
    /// Another host holds the order.
    HeldByOther(String),
}

impl OrderStore {
    /// Try to claim `order` for `identity`.
    pub fn try_claim(&self, order: &mut Order, identity: &str) -> OrderResult<ClaimOutcome> {
        let path = lock_path(self.project_root(), order.name());

        // Second pass only runs after clearing an abandoned empty marker.
        for _ in 0..2 {
            match create_marker(&path, identity) {
                Ok(()) => {
                    order.set_lock(Some(identity.to_string()));
                    tracing::debug!(order = order.name(), host = identity, "Claim acquired");
                    return Ok(ClaimOutcome::Acquired);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(OrderError::io(&path, e)),
            }

            match self.read_lock(order.name())? {
                Some(holder) => {
                    let outcome = if holder == identity {
                        ClaimOutcome::AlreadyOwnedBySelf
                    } else {
                        ClaimOutcome::HeldByOther(holder.clone())
                    };
                    order.set_lock(Some(holder));
                    return Ok(outcome);
                }
                None if !is_abandoned(&path)? => {
                    tracing::debug!(order = order.name(), "Claim marker is still being written");
                    order.set_lock(Some(String::new()));
                    return Ok(ClaimOutcome::HeldByOther(String::new()));
                }
                None => match std::fs::remove_file(&path) {
                    Ok(()) => {
                        tracing::warn!(order = order.name(), "Cleared abandoned empty claim marker");
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(OrderError::io(&path, e)),
                },
            }
        }

        let holder = self.read_lock(order.name())?.unwrap_or_default();
        order.set_lock(Some(holder.clone()));
        if holder == identity {
            Ok(ClaimOutcome::AlreadyOwnedBySelf)
        } else {
            Ok(ClaimOutcome::HeldByOther(holder))
        }
    }

    /// Drop the claim marker so any host may pick the order up again.
    pub fn release(&self, order: &mut Order) -> OrderResult<()> {
        let path = lock_path(self.project_root(), order.name());
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(OrderError::io(&path, e)),
        }
        order.set_lock(None);
        tracing::debug!(order = order.name(), "Claim released");
        Ok(())
    }
}

/// Whether the empty marker at `path` has outlived [`EMPTY_MARKER_GRACE`].
///
/// A marker that vanished meanwhile counts as abandoned so the claim is
/// retried.
fn is_abandoned(path: &Path) -> OrderResult<bool> {
    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(OrderError::io(path, e)),
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    Ok(age >= EMPTY_MARKER_GRACE)
}

/// Create the marker at `path` only if none exists.
fn create_marker(path: &Path, identity: &str) -> std::io::Result<()> {
    let safe_id: String = identity
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let tmp = path.with_file_name(format!(".lock.{safe_id}.{}.tmp", std::process::id()));

    std::fs::write(&tmp, identity)?;
    let linked = std::fs::hard_link(&tmp, path);
    let _ = std::fs::remove_file(&tmp);

    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "Hard link unavailable, creating marker directly");
            let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
            file.write_all(identity.as_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmhand_common::project::ORDERS_DIR;

    fn setup() -> (tempfile::TempDir, OrderStore, Order) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(ORDERS_DIR)).unwrap();
        let store = OrderStore::new(dir.path());
        let order = Order::new("wolf", "a.blend", chrono::Utc::now());
        store.persist(&order).unwrap();
        (dir, store, order)
    }

    #[test]
    fn test_claim_twice_is_idempotent_for_self() {
        let (_dir, store, mut order) = setup();
        assert_eq!(
            store.try_claim(&mut order, "render-01").unwrap(),
            ClaimOutcome::Acquired
        );
        assert_eq!(
            store.try_claim(&mut order, "render-01").unwrap(),
            ClaimOutcome::AlreadyOwnedBySelf
        );
        assert_eq!(order.lock(), Some("render-01"));
    }

    #[test]
    fn test_other_host_is_held_until_release() {
        let (_dir, store, mut order) = setup();
        let mut other_view = order.clone();

        store.try_claim(&mut order, "render-01").unwrap();
        for _ in 0..3 {
            assert_eq!(
                store.try_claim(&mut other_view, "render-02").unwrap(),
                ClaimOutcome::HeldByOther("render-01".to_string())
            );
        }

        store.release(&mut order).unwrap();
        assert_eq!(order.lock(), None);
        assert_eq!(
            store.try_claim(&mut other_view, "render-02").unwrap(),
            ClaimOutcome::Acquired
        );
    }

    #[test]
    fn test_marker_holds_only_identity() {
        let (dir, store, mut order) = setup();
        store.try_claim(&mut order, "render-01.local").unwrap();
        let content = std::fs::read_to_string(lock_path(dir.path(), "wolf")).unwrap();
        assert_eq!(content, "render-01.local");

        let entries = std::fs::read_dir(store.order_dir("wolf")).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[test]
    fn test_fresh_empty_marker_is_held() {
        let (dir, store, mut order) = setup();
        let path = lock_path(dir.path(), "wolf");
        std::fs::write(&path, "").unwrap();

        assert_eq!(
            store.try_claim(&mut order, "render-01").unwrap(),
            ClaimOutcome::HeldByOther(String::new())
        );
        assert!(path.exists());

        // The writer finishes; its claim stands.
        std::fs::write(&path, "render-02").unwrap();
        assert_eq!(
            store.try_claim(&mut order, "render-01").unwrap(),
            ClaimOutcome::HeldByOther("render-02".to_string())
        );
    }

    #[test]
    fn test_abandoned_empty_marker_is_reclaimed() {
        let (dir, store, mut order) = setup();
        let path = lock_path(dir.path(), "wolf");
        std::fs::write(&path, "").unwrap();
        let stale = SystemTime::now() - EMPTY_MARKER_GRACE * 2;
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(stale)
            .unwrap();

        assert_eq!(
            store.try_claim(&mut order, "render-01").unwrap(),
            ClaimOutcome::Acquired
        );
        assert_eq!(store.read_lock("wolf").unwrap().as_deref(), Some("render-01"));
    }

    #[test]
    fn test_release_without_marker_is_ok() {
        let (_dir, store, mut order) = setup();
        store.release(&mut order).unwrap();
        store.release(&mut order).unwrap();
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let (dir, store, order) = setup();
        let root = dir.path().to_path_buf();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = OrderStore::new(root.clone());
                let mut order = order.clone();
                std::thread::spawn(move || {
                    store
                        .try_claim(&mut order, &format!("host-{i}"))
                        .unwrap()
                })
            })
            .collect();

        let acquired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|outcome| *outcome == ClaimOutcome::Acquired)
            .count();
        assert_eq!(acquired, 1);
        assert!(store.read_lock("wolf").unwrap().is_some());
    }
}
