//! Storage trait for checkpoint backends
//!
//! [`CheckpointStore`] is the seam between the executor and durable storage.
//! The executor only ever calls [`put`](CheckpointStore::put) and
//! [`get_latest`](CheckpointStore::get_latest); everything else exists for
//! callers that want to inspect or prune a workflow's history.
//!
//! # Contract
//!
//! - Records are **append-only** per workflow id.
//! - `get_latest` returns the most recently written record, or `None` when the
//!   workflow has never been checkpointed. A missing workflow is not an error.
//! - `list` yields records in ascending write order.
//! - Writes for one workflow id must be serialized by the backend. The
//!   executor never drives one workflow id from two runs at once, but nothing
//!   stops a caller from doing so.
//!
//! # Implementing a backend
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use clan_checkpoint::{Checkpoint, CheckpointStore, CheckpointStream, Result};
//!
//! struct RedisCheckpointStore {
//!     client: redis::Client,
//! }
//!
//! #[async_trait]
//! impl CheckpointStore for RedisCheckpointStore {
//!     async fn put(&self, workflow_id: &str, checkpoint: Checkpoint) -> Result<()> {
//!         let mut conn = self.client.get_async_connection().await?;
//!         let value = serde_json::to_string(&checkpoint)?;
//!         conn.rpush(format!("checkpoints:{}", workflow_id), value).await?;
//!         Ok(())
//!     }
//!
//!     async fn get_latest(&self, workflow_id: &str) -> Result<Option<Checkpoint>> {
//!         let mut conn = self.client.get_async_connection().await?;
//!         let value: Option<String> = conn.lindex(format!("checkpoints:{}", workflow_id), -1).await?;
//!         value.map(|v| serde_json::from_str(&v)).transpose().map_err(Into::into)
//!     }
//!
//!     async fn list(&self, workflow_id: &str) -> Result<CheckpointStream> {
//!         // LRANGE 0 -1 and stream the decoded entries
//!         todo!()
//!     }
//! }
//! ```

use crate::{
    checkpoint::{Checkpoint, CheckpointEntry},
    error::{CheckpointError, Result},
};
use async_trait::async_trait;
use futures::stream::{Stream, TryStreamExt};
use std::pin::Pin;

/// Type alias for async stream of stored checkpoints
pub type CheckpointStream =
    Pin<Box<dyn Stream<Item = Result<CheckpointEntry>> + Send + 'static>>;

/// Durable, append-only record of traversal progress keyed by workflow id
///
/// Implementations must be thread-safe (`Send + Sync`); one store is usually
/// shared by every run in a process.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Append a checkpoint to the workflow's history
    async fn put(&self, workflow_id: &str, checkpoint: Checkpoint) -> Result<()>;

    /// Fetch the most recently written checkpoint for a workflow
    async fn get_latest(&self, workflow_id: &str) -> Result<Option<Checkpoint>>;

    /// Stream the workflow's history, oldest first
    async fn list(&self, workflow_id: &str) -> Result<CheckpointStream>;

    /// Collect the workflow's history, oldest first
    async fn list_all(&self, workflow_id: &str) -> Result<Vec<Checkpoint>> {
        self.list(workflow_id)
            .await?
            .map_ok(|entry| entry.checkpoint)
            .try_collect()
            .await
    }

    /// Remove every checkpoint recorded for a workflow
    ///
    /// The default implementation reports the operation as unsupported.
    async fn delete_workflow(&self, workflow_id: &str) -> Result<()> {
        Err(CheckpointError::Storage(format!(
            "delete_workflow not supported by this backend (workflow '{}')",
            workflow_id
        )))
    }
}

#[async_trait]
impl<T: CheckpointStore + ?Sized> CheckpointStore for std::sync::Arc<T> {
    async fn put(&self, workflow_id: &str, checkpoint: Checkpoint) -> Result<()> {
        (**self).put(workflow_id, checkpoint).await
    }

    async fn get_latest(&self, workflow_id: &str) -> Result<Option<Checkpoint>> {
        (**self).get_latest(workflow_id).await
    }

    async fn list(&self, workflow_id: &str) -> Result<CheckpointStream> {
        (**self).list(workflow_id).await
    }

    async fn list_all(&self, workflow_id: &str) -> Result<Vec<Checkpoint>> {
        (**self).list_all(workflow_id).await
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<()> {
        (**self).delete_workflow(workflow_id).await
    }
}
