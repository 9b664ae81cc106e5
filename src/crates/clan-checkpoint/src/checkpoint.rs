//! Checkpoint records for resumable graph traversal
//!
//! A [`Checkpoint`] is a **pre-image**: it records the node that is *about to*
//! run, the state it is about to run on, and the traversal depth at that point.
//! The executor writes one before every transition, so resuming from the latest
//! checkpoint re-runs the recorded node rather than skipping it.
//!
//! ```text
//!   depth 0            depth 1            depth 2
//!  ┌──────────┐       ┌──────────┐       ┌──────────┐
//!  │ put(A,s0)│──A──▶ │ put(B,s1)│──B──▶ │put(End,s2)│
//!  └──────────┘       └──────────┘       └──────────┘
//! ```
//!
//! Records are attributed to a workflow id by the store, which also stamps a
//! [`CheckpointEntry`] with a unique id when listing history.
//!
//! # Example
//!
//! ```rust
//! use clan_checkpoint::Checkpoint;
//!
//! let checkpoint = Checkpoint::from_state("Reviewer", &vec!["draft"], 2).unwrap();
//! assert_eq!(checkpoint.node_name, "Reviewer");
//! assert_eq!(checkpoint.state, r#"["draft"]"#);
//!
//! let restored: Vec<String> = checkpoint.restore_state().unwrap();
//! assert_eq!(restored, vec!["draft".to_string()]);
//! ```

use crate::error::Result;
use crate::serializer::{decode_state, encode_state};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier assigned to a stored checkpoint
pub type CheckpointId = String;

/// Snapshot of a traversal taken just before `node_name` runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Node about to execute. Reserved terminals keep their literal names
    /// (`End`, `Pause`).
    pub node_name: String,

    /// Execution state, serialized as JSON text
    pub state: String,

    /// Number of transitions completed before this step
    pub depth: usize,

    /// Write timestamp, used to order history
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Create a checkpoint from an already-serialized state snapshot
    pub fn new(node_name: impl Into<String>, state: impl Into<String>, depth: usize) -> Self {
        Self {
            node_name: node_name.into(),
            state: state.into(),
            depth,
            created_at: Utc::now(),
        }
    }

    /// Serialize `state` and wrap it in a checkpoint
    pub fn from_state<T: Serialize + ?Sized>(
        node_name: impl Into<String>,
        state: &T,
        depth: usize,
    ) -> Result<Self> {
        Ok(Self::new(node_name, encode_state(state)?, depth))
    }

    /// Decode the stored snapshot back into a state value
    pub fn restore_state<T: DeserializeOwned>(&self) -> Result<T> {
        decode_state(&self.state)
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A checkpoint as held by a store, with its identity and owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub id: CheckpointId,

    pub workflow_id: String,

    pub checkpoint: Checkpoint,
}

impl CheckpointEntry {
    pub fn new(workflow_id: impl Into<String>, checkpoint: Checkpoint) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            checkpoint,
        }
    }
}
