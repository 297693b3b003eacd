//! Route file watcher for `watch` reload mode.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::store::RouteStore;

/// Reloads the route store's snapshot whenever its document changes on disk.
///
/// The parent directory is watched rather than the file itself: saves replace
/// the document by rename, which would orphan a watch on the old inode.
pub struct RouteWatcher {
    store: Arc<RouteStore>,
}

impl RouteWatcher {
    pub fn new(store: Arc<RouteStore>) -> Self {
        Self { store }
    }

    /// Start watching. Must be called from within a Tokio runtime.
    ///
    /// Reloading stops when the returned watcher is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let file_name = self.store.path().file_name().map(|n| n.to_os_string());
        let dir = watch_dir(self.store.path());
        std::fs::create_dir_all(&dir).map_err(notify::Error::io)?;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let kind = event.kind;
                    let changed = kind.is_modify() || kind.is_create() || kind.is_remove();
                    if changed && touches(&event.paths, file_name.as_ref()) {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Route file watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let store = self.store;
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // One reload covers a burst of events.
                while rx.try_recv().is_ok() {}

                match store.reload().await {
                    Ok(table) => tracing::info!(routes = table.len(), "Route table reloaded"),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to reload routes. Keeping current table.")
                    }
                }
            }
            tracing::debug!("Route watcher stopped");
        });

        tracing::info!(path = %dir.display(), "Route watcher started");
        Ok(watcher)
    }
}

fn watch_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn touches(paths: &[PathBuf], file_name: Option<&OsString>) -> bool {
    let Some(file_name) = file_name else {
        return false;
    };
    paths
        .iter()
        .any(|p| p.file_name().is_some_and(|n| n == file_name.as_os_str()))
}
