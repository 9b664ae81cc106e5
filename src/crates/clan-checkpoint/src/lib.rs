//! # clan-checkpoint - Durable progress for graph traversals
//!
//! **Trait-based checkpoint storage** for the clan execution engine. A
//! checkpoint is written before every step of a traversal, which lets a run
//! that crashed, failed or paused be picked up again by a later invocation
//! using the same workflow id.
//!
//! ## Core Concepts
//!
//! ### 1. CheckpointStore Trait
//!
//! [`CheckpointStore`] is the interface every backend implements:
//!
//! - **`put()`** - Append a checkpoint to a workflow's history
//! - **`get_latest()`** - Most recent checkpoint, used to resume
//! - **`list()`** / **`list_all()`** - History, oldest first
//! - **`delete_workflow()`** - Prune a finished workflow (optional)
//!
//! ### 2. Checkpoint Records
//!
//! A [`Checkpoint`] holds the node that is about to run, the execution state
//! serialized as JSON text, and the traversal depth. Stores wrap each record in
//! a [`CheckpointEntry`] carrying a unique id and the owning workflow id.
//!
//! ### 3. Backends
//!
//! - [`InMemoryCheckpointStore`] - Tests and short-lived processes
//! - [`SqliteCheckpointStore`] - Single-node persistence across restarts
//! - [`factory::open_store`] - Pick a backend by name (`memory`, `sqlite3`)
//!
//! ## Quick Start
//!
//! ```rust
//! use clan_checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryCheckpointStore::new();
//!
//!     let checkpoint = Checkpoint::from_state("Programmer", &vec!["hello"], 0)?;
//!     store.put("workflow-123", checkpoint).await?;
//!
//!     if let Some(latest) = store.get_latest("workflow-123").await? {
//!         let state: Vec<String> = latest.restore_state()?;
//!         println!("resume at {} with {:?}", latest.node_name, state);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              clan-core (Executor run loop)              │
//! │  • get_latest() once at start                           │
//! │  • put() before every transition                        │
//! └────────────────────┬────────────────────────────────────┘
//!                      │ CheckpointStore trait
//!                      ▼
//!         ┌────────────┴────────────┬──────────────┐
//!         ▼                         ▼              ▼
//!  ┌──────────────┐    ┌─────────────────┐   ┌─────────┐
//!  │  In-Memory   │    │     SQLite      │   │ Custom  │
//!  └──────────────┘    └─────────────────┘   └─────────┘
//! ```

pub mod checkpoint;
pub mod error;
pub mod factory;
pub mod memory;
pub mod serializer;
pub mod sqlite;
pub mod traits;

// Re-export main types
pub use checkpoint::{Checkpoint, CheckpointEntry, CheckpointId};
pub use error::{CheckpointError, Result};
pub use factory::{open_store, StoreConfig};
pub use memory::InMemoryCheckpointStore;
pub use serializer::{decode_state, encode_state};
pub use sqlite::SqliteCheckpointStore;
pub use traits::{CheckpointStore, CheckpointStream};
