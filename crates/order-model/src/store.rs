//! The order store: the queue directory and the manifests inside it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use farmhand_common::project::{lock_path, manifest_path, order_dir, MANIFEST_NAME, ORDERS_DIR};

use crate::error::{OrderError, OrderResult};
use crate::order::Order;

/// Orders of one project, stored as `.farmhand/orders/<name>/order.toml`.
#[derive(Debug, Clone)]
pub struct OrderStore {
    root: PathBuf,
}

impl OrderStore {
    /// Open the store of the project rooted at `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            root: project_root.into(),
        }
    }

    /// Project root this store belongs to.
    pub fn project_root(&self) -> &Path {
        &self.root
    }

    /// Queue directory.
    pub fn orders_dir(&self) -> PathBuf {
        self.root.join(ORDERS_DIR)
    }

    /// Directory of a single order.
    pub fn order_dir(&self, name: &str) -> PathBuf {
        order_dir(&self.root, name)
    }

    /// Load every order, oldest first.
    ///
    /// Fails as a whole if any order directory has a missing or unreadable
    /// manifest. Orders with equal timestamps keep directory-name order.
    pub fn load_all(&self) -> OrderResult<Vec<Order>> {
        let dir = self.orders_dir();
        let entries = std::fs::read_dir(&dir).map_err(|e| OrderError::io(&dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| OrderError::io(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| OrderError::io(entry.path(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            // Dot directories are orders still being staged.
            if file_type.is_dir() && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();

        let mut orders = names
            .iter()
            .map(|name| self.load(name))
            .collect::<OrderResult<Vec<_>>>()?;

        orders.sort_by_key(|order| order.created_at);

        tracing::debug!(count = orders.len(), dir = %dir.display(), "Loaded orders");
        Ok(orders)
    }

    /// Load one order by name, including its current claim holder.
    pub fn load(&self, name: &str) -> OrderResult<Order> {
        let path = manifest_path(&self.root, name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound && !self.order_dir(name).is_dir() => {
                return Err(OrderError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(e) => return Err(OrderError::io(&path, e)),
        };

        let mut order: Order = toml::from_str(&content).map_err(|e| OrderError::ParseError {
            path: path.clone(),
            source: e,
        })?;

        if order.name() != name {
            return Err(OrderError::ValidationError {
                path,
                message: format!(
                    "manifest names '{}' but lives in directory '{name}'",
                    order.name()
                ),
            });
        }
        order
            .validate()
            .map_err(|message| OrderError::ValidationError {
                path: path.clone(),
                message,
            })?;

        order.set_lock(self.read_lock(name)?);
        Ok(order)
    }

    /// Write the order's manifest, replacing any previous version.
    ///
    /// The manifest is written to a sibling temp file and renamed into place
    /// so readers on other hosts never see a partial file.
    pub fn persist(&self, order: &Order) -> OrderResult<()> {
        write_manifest(&self.order_dir(order.name()), order)?;
        tracing::debug!(order = order.name(), complete = order.complete, "Persisted order");
        Ok(())
    }

    /// Persist a brand-new order, refusing to overwrite an existing one.
    pub fn create(&self, order: &Order) -> OrderResult<()> {
        if manifest_path(&self.root, order.name()).exists() {
            return Err(OrderError::AlreadyExists {
                name: order.name().to_string(),
            });
        }
        self.persist(order)
    }

    /// Publish a fully prepared order directory.
    ///
    /// `staging` must sit inside the orders directory and start with a dot so
    /// [`load_all`](Self::load_all) ignores it. The manifest is written into
    /// it and the whole directory is renamed into place, so other hosts never
    /// see a half-built order.
    pub fn adopt(&self, order: &Order, staging: &Path) -> OrderResult<()> {
        let dir = self.order_dir(order.name());
        if dir.exists() {
            return Err(OrderError::AlreadyExists {
                name: order.name().to_string(),
            });
        }
        write_manifest(staging, order)?;
        std::fs::rename(staging, &dir).map_err(|e| OrderError::io(&dir, e))?;
        tracing::debug!(order = order.name(), "Adopted staged order");
        Ok(())
    }

    /// Mark an order pending again and move it to the back of the queue.
    pub fn reset(&self, name: &str, now: DateTime<Utc>) -> OrderResult<Order> {
        let mut order = self.load(name)?;
        order.complete = false;
        order.created_at = now;
        self.persist(&order)?;
        self.release(&mut order)?;
        tracing::info!(order = name, "Order reset");
        Ok(order)
    }

    /// Delete an order directory and everything in it.
    pub fn remove(&self, name: &str) -> OrderResult<()> {
        let dir = self.order_dir(name);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!(order = name, "Order removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(OrderError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(OrderError::io(&dir, e)),
        }
    }

    /// Remove finished orders, or every order when `hard` is set.
    ///
    /// Returns the removed names in queue order.
    pub fn clean(&self, hard: bool) -> OrderResult<Vec<String>> {
        let mut removed = Vec::new();
        for order in self.load_all()? {
            if hard || order.complete {
                self.remove(order.name())?;
                removed.push(order.name().to_string());
            }
        }
        Ok(removed)
    }

    /// Current content of an order's claim marker, if any.
    pub fn read_lock(&self, name: &str) -> OrderResult<Option<String>> {
        let path = lock_path(&self.root, name);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let holder = content.trim();
                Ok((!holder.is_empty()).then(|| holder.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OrderError::io(&path, e)),
        }
    }
}

fn write_manifest(dir: &Path, order: &Order) -> OrderResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| OrderError::io(dir, e))?;

    let content = toml::to_string(order).map_err(|e| OrderError::EncodeError {
        name: order.name().to_string(),
        source: e,
    })?;

    let path = dir.join(MANIFEST_NAME);
    let tmp_path = dir.join(format!(".{MANIFEST_NAME}.{}.tmp", std::process::id()));
    std::fs::write(&tmp_path, content).map_err(|e| OrderError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        OrderError::io(&path, e)
    })
}
