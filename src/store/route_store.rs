//! File-backed route table storage.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

use crate::config::ReloadMode;
use crate::routing::RouteTable;

/// Failure reading or writing the route document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read route file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse route file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode route table: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write route file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Durable route table persisted as a single JSON document.
///
/// Every file access happens under one store-wide lock, so a load never
/// observes a half-written save. Writes go to a sibling temp file that is
/// renamed over the document. A snapshot of the last table seen by `save`,
/// `modify` or `reload` is kept behind an `ArcSwap` for lock-free readers.
pub struct RouteStore {
    path: PathBuf,
    lock: Mutex<()>,
    snapshot: ArcSwap<RouteTable>,
}

impl RouteStore {
    /// Create a store for the document at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            snapshot: ArcSwap::from_pointee(RouteTable::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing file is an empty table.
    pub async fn load(&self) -> Result<RouteTable, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_file().await
    }

    /// Replace the document with `table`.
    pub async fn save(&self, table: &RouteTable) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.write_file(table).await?;
        self.snapshot.store(Arc::new(table.clone()));
        Ok(())
    }

    /// Read-modify-write under a single lock acquisition.
    ///
    /// The table is saved only when `f` succeeds; an error from `f` leaves the
    /// document untouched.
    pub async fn modify<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut RouteTable) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().await;
        let mut table = self.read_file().await?;
        let out = f(&mut table)?;
        self.write_file(&table).await?;
        self.snapshot.store(Arc::new(table));
        Ok(out)
    }

    /// Re-read the document and publish it as the current snapshot.
    pub async fn reload(&self) -> Result<Arc<RouteTable>, StoreError> {
        let _guard = self.lock.lock().await;
        let table = Arc::new(self.read_file().await?);
        self.snapshot.store(Arc::clone(&table));
        Ok(table)
    }

    /// Last published table, without touching the file.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.snapshot.load_full()
    }

    /// The table a routing decision should use under `mode`.
    pub async fn current(&self, mode: ReloadMode) -> Result<Arc<RouteTable>, StoreError> {
        match mode {
            ReloadMode::PerRequest => self.load().await.map(Arc::new),
            ReloadMode::Watch => Ok(self.snapshot()),
        }
    }

    async fn read_file(&self) -> Result<RouteTable, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RouteTable::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_file(&self, table: &RouteTable) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(table).map_err(StoreError::Encode)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = self.temp_path();
        fs::write(&tmp, &data).await.map_err(write_err)?;
        fs::rename(&tmp, &self.path).await.map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), routes = table.len(), "Route table saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
