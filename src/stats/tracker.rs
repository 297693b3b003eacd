//! In-memory counters with a durable write-behind log.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::stats::{Outcome, PathStat, StatsError, StatsStorage, WriteOp};

#[derive(Debug, Default)]
struct PathCounters {
    success: AtomicU64,
    fail: AtomicU64,
}

impl PathCounters {
    fn bump(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Success => &self.success,
            Outcome::Fail => &self.fail,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn to_stat(&self, path: &str) -> PathStat {
        PathStat {
            path: path.to_string(),
            success: self.success.load(Ordering::Relaxed),
            fail: self.fail.load(Ordering::Relaxed),
        }
    }
}

/// Durable writes beyond this many queued are dropped.
const QUEUE_CAPACITY: usize = 8192;

/// Most queued commands the writer takes per transaction.
const MAX_BATCH: usize = 256;

enum WriteCommand {
    Write(WriteOp),
    Snapshot { reply: oneshot::Sender<Result<Vec<PathStat>, StatsError>> },
    Close,
}

/// Success/failure counters per path.
///
/// Reads and increments hit the in-memory map only. Every mutation is also
/// queued to a single blocking writer task that owns the SQLite connection,
/// so durable writes never run on a request's task and are applied in the
/// order they were issued. The writer commits whatever has queued up in one
/// transaction. When the queue is full the durable write is dropped; the
/// in-memory counter has already been updated.
pub struct StatsTracker {
    counters: DashMap<String, PathCounters>,
    writer: mpsc::Sender<WriteCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl StatsTracker {
    /// Open the database at `path`, load its rows and start the writer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        let storage = StatsStorage::open(path)?;
        Ok(Self::with_storage(storage))
    }

    /// Start a tracker over already-opened storage.
    pub fn with_storage(storage: StatsStorage) -> Self {
        Self::with_queue_capacity(storage, QUEUE_CAPACITY)
    }

    fn with_queue_capacity(storage: StatsStorage, capacity: usize) -> Self {
        let counters = DashMap::new();
        match storage.load_all() {
            Ok(rows) => {
                for row in rows {
                    counters.insert(
                        row.path,
                        PathCounters {
                            success: AtomicU64::new(row.success),
                            fail: AtomicU64::new(row.fail),
                        },
                    );
                }
                tracing::info!(
                    paths = counters.len(),
                    database = %storage.path().display(),
                    "Loaded stats"
                );
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load stats; starting from zero"),
        }

        let (writer, rx) = mpsc::channel(capacity);
        let worker = tokio::task::spawn_blocking(move || run_writer(storage, rx));

        Self {
            counters,
            writer,
            worker: Mutex::new(Some(worker)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Count one request outcome for `path`.
    ///
    /// The in-memory counter is updated before this returns; the durable
    /// upsert is queued and its failure only logged.
    pub fn record(&self, path: &str, outcome: Outcome) {
        // The read guard must be gone before `entry` takes the shard's write lock.
        let existing = self.counters.get(path).map(|c| c.bump(outcome)).is_some();
        if !existing {
            self.counters.entry(path.to_string()).or_default().bump(outcome);
        }

        self.queue(WriteOp::Increment {
            path: path.to_string(),
            outcome,
        });
    }

    /// Forget a path's counters in memory and on disk.
    pub fn delete(&self, path: &str) {
        self.counters.remove(path);
        self.queue(WriteOp::Delete {
            path: path.to_string(),
        });
    }

    /// In-memory snapshot of every path.
    pub fn all(&self) -> BTreeMap<String, PathStat> {
        self.counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().to_stat(entry.key())))
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<PathStat> {
        self.counters.get(path).map(|c| c.to_stat(path))
    }

    /// Durable writes dropped because the writer fell behind.
    pub fn dropped_writes(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Read the durable table.
    ///
    /// Queued behind every write issued before the call, so it reflects them.
    pub async fn persisted(&self) -> Result<Vec<PathStat>, StatsError> {
        let (reply, rx) = oneshot::channel();
        self.writer
            .send(WriteCommand::Snapshot { reply })
            .await
            .map_err(|_| StatsError::WriterClosed)?;
        rx.await.map_err(|_| StatsError::WriterClosed)?
    }

    /// Flush queued writes and stop the writer.
    ///
    /// Counters keep working in memory afterwards; durable writes are dropped.
    pub async fn close(&self) {
        let worker = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(worker) = worker else {
            return;
        };

        let _ = self.writer.send(WriteCommand::Close).await;
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "Stats writer panicked");
        }
        tracing::info!("Stats writer closed");
    }

    fn queue(&self, op: WriteOp) {
        match self.writer.try_send(WriteCommand::Write(op)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    tracing::warn!(dropped, "Stats writer behind; durable write dropped");
                }
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Stats writer closed; durable write skipped");
            }
        }
    }
}

fn run_writer(mut storage: StatsStorage, mut rx: mpsc::Receiver<WriteCommand>) {
    let mut commands = Vec::with_capacity(MAX_BATCH);
    let mut ops = Vec::with_capacity(MAX_BATCH);

    while let Some(first) = rx.blocking_recv() {
        commands.push(first);
        while commands.len() < MAX_BATCH {
            match rx.try_recv() {
                Ok(command) => commands.push(command),
                Err(_) => break,
            }
        }

        for command in commands.drain(..) {
            match command {
                WriteCommand::Write(op) => ops.push(op),
                WriteCommand::Snapshot { reply } => {
                    flush(&mut storage, &mut ops);
                    let _ = reply.send(storage.load_all());
                }
                WriteCommand::Close => {
                    flush(&mut storage, &mut ops);
                    return;
                }
            }
        }
        flush(&mut storage, &mut ops);
    }
}

fn flush(storage: &mut StatsStorage, ops: &mut Vec<WriteOp>) {
    if ops.is_empty() {
        return;
    }
    if let Err(e) = storage.apply(ops) {
        tracing::warn!(writes = ops.len(), error = %e, "Failed to persist stats batch");
    }
    ops.clear();
}
