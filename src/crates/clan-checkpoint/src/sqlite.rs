//! SQLite-backed checkpoint storage
//!
//! [`SqliteCheckpointStore`] persists checkpoints in a single `checkpoints`
//! table, so a workflow can be resumed by a later process:
//!
//! ```sql
//! CREATE TABLE checkpoints (
//!     id            INTEGER PRIMARY KEY AUTOINCREMENT,
//!     checkpoint_id TEXT NOT NULL,
//!     workflow_id   TEXT NOT NULL,
//!     node_name     TEXT NOT NULL,
//!     state         TEXT NOT NULL,
//!     depth         INTEGER NOT NULL,
//!     created_at    TEXT NOT NULL
//! );
//! ```
//!
//! The connection lives behind a mutex and every statement runs on tokio's
//! blocking pool, so the async executor never stalls on disk I/O. The mutex
//! also serializes writes for a workflow id. History is ordered by the
//! autoincrement `id`, which is the write order even when timestamps collide.
//!
//! # Example
//!
//! ```rust,no_run
//! use clan_checkpoint::{Checkpoint, CheckpointStore, SqliteCheckpointStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteCheckpointStore::open("./checkpoints.db")?;
//!     store.put("sample", Checkpoint::new("Programmer", "{}", 0)).await?;
//!
//!     for checkpoint in store.list_all("sample").await? {
//!         println!("{} @ {}", checkpoint.node_name, checkpoint.depth);
//!     }
//!     Ok(())
//! }
//! ```

use crate::{
    checkpoint::{Checkpoint, CheckpointEntry},
    error::{CheckpointError, Result},
    traits::{CheckpointStore, CheckpointStream},
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
    PRAGMA journal_mode=WAL;

    CREATE TABLE IF NOT EXISTS checkpoints (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        checkpoint_id TEXT NOT NULL,
        workflow_id TEXT NOT NULL,
        node_name TEXT NOT NULL,
        state TEXT NOT NULL,
        depth INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_checkpoints_workflow
        ON checkpoints(workflow_id, id);
";

/// Raw column values, decoded outside the rusqlite row closure
type CheckpointRow = (String, String, String, String, i64, String);

/// Persistent checkpoint store backed by SQLite
#[derive(Debug, Clone)]
pub struct SqliteCheckpointStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointStore {
    /// Open or create the checkpoint database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::debug!(path = %path.display(), "Opening SQLite checkpoint store");
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| CheckpointError::Storage(format!("connection lock poisoned: {}", e)))?;
            f(&conn)
        })
        .await?
    }
}

fn decode_row(row: CheckpointRow) -> Result<CheckpointEntry> {
    let (checkpoint_id, workflow_id, node_name, state, depth, created_at) = row;

    let depth = usize::try_from(depth)
        .map_err(|_| CheckpointError::Invalid(format!("negative depth {}", depth)))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| CheckpointError::Invalid(format!("bad timestamp '{}': {}", created_at, e)))?
        .with_timezone(&Utc);

    Ok(CheckpointEntry {
        id: checkpoint_id,
        workflow_id,
        checkpoint: Checkpoint {
            node_name,
            state,
            depth,
            created_at,
        },
    })
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CheckpointRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn put(&self, workflow_id: &str, checkpoint: Checkpoint) -> Result<()> {
        let entry = CheckpointEntry::new(workflow_id, checkpoint);
        let depth = i64::try_from(entry.checkpoint.depth)
            .map_err(|_| CheckpointError::Invalid("depth overflows INTEGER".to_string()))?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO checkpoints (checkpoint_id, workflow_id, node_name, state, depth, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.id,
                    entry.workflow_id,
                    entry.checkpoint.node_name,
                    entry.checkpoint.state,
                    depth,
                    entry
                        .checkpoint
                        .created_at
                        .to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_latest(&self, workflow_id: &str) -> Result<Option<Checkpoint>> {
        let workflow_id = workflow_id.to_string();
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT checkpoint_id, workflow_id, node_name, state, depth, created_at
                         FROM checkpoints
                         WHERE workflow_id = ?1
                         ORDER BY id DESC
                         LIMIT 1",
                        params![workflow_id],
                        read_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        row.map(|row| decode_row(row).map(|entry| entry.checkpoint))
            .transpose()
    }

    async fn list(&self, workflow_id: &str) -> Result<CheckpointStream> {
        let workflow_id = workflow_id.to_string();
        let rows = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT checkpoint_id, workflow_id, node_name, state, depth, created_at
                     FROM checkpoints
                     WHERE workflow_id = ?1
                     ORDER BY id ASC",
                )?;
                let rows = stmt
                    .query_map(params![workflow_id], read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        let entries: Vec<Result<CheckpointEntry>> = rows.into_iter().map(decode_row).collect();
        Ok(Box::pin(stream::iter(entries)))
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<()> {
        let workflow_id = workflow_id.to_string();
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM checkpoints WHERE workflow_id = ?1",
                params![workflow_id],
            )?;
            tracing::debug!(workflow_id = %workflow_id, deleted, "Deleted checkpoints");
            Ok(())
        })
        .await
    }
}
