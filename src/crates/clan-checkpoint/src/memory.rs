//! In-memory checkpoint storage for development and testing
//!
//! [`InMemoryCheckpointStore`] keeps every workflow's history in a
//! `Vec<CheckpointEntry>` behind an `Arc<RwLock<HashMap>>`. Cloning the store
//! shares the same data, so a test can hand one clone to the executor and keep
//! another to inspect what was written.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Arc<RwLock<HashMap<workflow_id, Vec<..>>>>  │
//! │    "sample"  ─┬─ [0] Programmer  depth 0     │
//! │               ├─ [1] Reviewer    depth 1     │
//! │               └─ [2] End         depth 2     │
//! │    "other"   ─── [0] Planner     depth 0     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Data is lost when the process exits. Use
//! [`SqliteCheckpointStore`](crate::sqlite::SqliteCheckpointStore) when a
//! workflow has to survive a restart.
//!
//! # Example
//!
//! ```rust
//! use clan_checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryCheckpointStore::new();
//!     store.put("sample", Checkpoint::new("Programmer", "{}", 0)).await?;
//!
//!     let latest = store.get_latest("sample").await?.unwrap();
//!     assert_eq!(latest.node_name, "Programmer");
//!     Ok(())
//! }
//! ```

use crate::{
    checkpoint::{Checkpoint, CheckpointEntry},
    error::Result,
    traits::{CheckpointStore, CheckpointStream},
};
use async_trait::async_trait;
use futures::stream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory checkpoint storage
type CheckpointStorage = Arc<RwLock<HashMap<String, Vec<CheckpointEntry>>>>;

/// In-memory checkpoint store
#[derive(Debug, Clone)]
pub struct InMemoryCheckpointStore {
    storage: CheckpointStorage,
}

impl InMemoryCheckpointStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the number of workflows being tracked
    pub async fn workflow_count(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Get the total number of checkpoints across all workflows
    pub async fn checkpoint_count(&self) -> usize {
        self.storage
            .read()
            .await
            .values()
            .map(|entries| entries.len())
            .sum()
    }

    /// Clear all checkpoints (useful for testing)
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn put(&self, workflow_id: &str, checkpoint: Checkpoint) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage
            .entry(workflow_id.to_string())
            .or_default()
            .push(CheckpointEntry::new(workflow_id, checkpoint));
        Ok(())
    }

    async fn get_latest(&self, workflow_id: &str) -> Result<Option<Checkpoint>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(workflow_id)
            .and_then(|entries| entries.last())
            .map(|entry| entry.checkpoint.clone()))
    }

    async fn list(&self, workflow_id: &str) -> Result<CheckpointStream> {
        let storage = self.storage.read().await;
        let results: Vec<Result<CheckpointEntry>> = storage
            .get(workflow_id)
            .map(|entries| entries.iter().cloned().map(Ok).collect())
            .unwrap_or_default();

        Ok(Box::pin(stream::iter(results)))
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage.remove(workflow_id);
        Ok(())
    }
}
