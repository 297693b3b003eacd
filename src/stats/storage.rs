//! SQLite-backed durable counter table.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection};

use crate::stats::{Outcome, PathStat, StatsError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS stats (
    path TEXT PRIMARY KEY,
    success_count INTEGER NOT NULL DEFAULT 0,
    fail_count INTEGER NOT NULL DEFAULT 0
)";

// The increment happens inside the statement, so concurrent writers to the
// same row never read-modify-write from the caller's side.
const UPSERT_SUCCESS: &str = "INSERT INTO stats (path, success_count, fail_count) VALUES (?1, 1, 0)
    ON CONFLICT(path) DO UPDATE SET success_count = success_count + 1";

const UPSERT_FAIL: &str = "INSERT INTO stats (path, success_count, fail_count) VALUES (?1, 0, 1)
    ON CONFLICT(path) DO UPDATE SET fail_count = fail_count + 1";

/// One queued change to the durable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Increment { path: String, outcome: Outcome },
    Delete { path: String },
}

/// Durable per-path counters.
pub struct StatsStorage {
    conn: Connection,
    path: PathBuf,
}

impl StatsStorage {
    /// Open (or create) the database and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| StatsError::Open {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(StatsError::Schema)?;
        conn.execute_batch(SCHEMA).map_err(StatsError::Schema)?;

        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add one to the column matching `outcome`, creating the row if needed.
    pub fn increment(&self, path: &str, outcome: Outcome) -> Result<(), StatsError> {
        increment(&self.conn, path, outcome).map_err(StatsError::Query)
    }

    /// Remove a path's row. Deleting an absent row is not an error.
    pub fn delete(&self, path: &str) -> Result<(), StatsError> {
        delete(&self.conn, path).map_err(StatsError::Query)
    }

    /// Apply `ops` in order inside a single transaction.
    ///
    /// Either every change commits or none does.
    pub fn apply(&mut self, ops: &[WriteOp]) -> Result<(), StatsError> {
        let tx = self.conn.transaction().map_err(StatsError::Query)?;
        for op in ops {
            let applied = match op {
                WriteOp::Increment { path, outcome } => increment(&tx, path, *outcome),
                WriteOp::Delete { path } => delete(&tx, path),
            };
            applied.map_err(StatsError::Query)?;
        }
        tx.commit().map_err(StatsError::Query)
    }

    /// Every stored row, ordered by path.
    pub fn load_all(&self) -> Result<Vec<PathStat>, StatsError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT path, success_count, fail_count FROM stats ORDER BY path")
            .map_err(StatsError::Query)?;

        let rows = stmt
            .query_map([], |row| {
                let success: i64 = row.get(1)?;
                let fail: i64 = row.get(2)?;
                Ok(PathStat {
                    path: row.get(0)?,
                    success: u64::try_from(success).unwrap_or(0),
                    fail: u64::try_from(fail).unwrap_or(0),
                })
            })
            .map_err(StatsError::Query)?;

        let stats = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(StatsError::Query)?;
        Ok(stats)
    }
}

fn increment(conn: &Connection, path: &str, outcome: Outcome) -> rusqlite::Result<()> {
    let sql = match outcome {
        Outcome::Success => UPSERT_SUCCESS,
        Outcome::Fail => UPSERT_FAIL,
    };
    conn.prepare_cached(sql)?.execute(params![path])?;
    Ok(())
}

fn delete(conn: &Connection, path: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM stats WHERE path = ?1", params![path])?;
    Ok(())
}
