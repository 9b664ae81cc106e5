//! # clan-core - Resumable directed-graph execution
//!
//! **A small state-machine engine for multi-agent workflows.** Register named
//! nodes, each with an async transition and a selector that names the next
//! node, then walk the graph from a start node until it reaches `End` or
//! `Pause`.
//!
//! ## Overview
//!
//! - **Generic state** - any serde type; the engine never looks inside it
//! - **Checkpoint/resume** - a pre-image is stored before every step
//! - **Pause** - suspend a run and continue it in a later invocation
//! - **Depth guard** - cyclic graphs fail instead of looping forever
//! - **Streaming** - per-step snapshots over a bounded, backpressured channel
//!
//! ## Core Concepts
//!
//! ### 1. Graph
//!
//! [`Graph`] owns every [`Node`]. A node pairs a [`Transition`] (state in,
//! state out) with a [`Selector`] (state in, next node name out). The two
//! reserved names [`END`] and [`PAUSE`] resolve in every graph.
//!
//! ### 2. Executor
//!
//! [`Executor::run`] (or [`Graph::execute`]) drives one traversal with a set
//! of [`ExecuteOptions`]: a depth bound, an optional workflow id plus
//! checkpoint store, and an optional [`StreamSink`].
//!
//! ### 3. Checkpoints
//!
//! Checkpoints come from the `clan-checkpoint` crate. Because they are taken
//! *before* a node runs, resuming after a crash re-runs that node. Transitions
//! with side effects should be idempotent.
//!
//! ## Quick Start
//!
//! ```rust
//! use clan_core::{ExecuteOptions, Graph, END};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Default, Serialize, Deserialize)]
//! struct ReviewState {
//!     code: String,
//!     feedback: Vec<String>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> clan_core::Result<()> {
//!     let mut graph = Graph::new();
//!
//!     graph.add_node("Programmer", |mut state: ReviewState| async move {
//!         state.code.push_str("fn main() {}\n");
//!         Ok(state)
//!     });
//!     graph.add_node("Reviewer", |mut state: ReviewState| async move {
//!         state.feedback.push("looks good".to_string());
//!         Ok(state)
//!     });
//!
//!     graph.add_edge("Programmer", "Reviewer")?;
//!     graph.add_conditional_edge("Reviewer", |state: &ReviewState| {
//!         Ok(if state.feedback.len() < 2 { "Programmer" } else { END }.to_string())
//!     })?;
//!     graph.set_start_node("Programmer")?;
//!
//!     let result = graph.execute(ReviewState::default(), ExecuteOptions::new()).await?;
//!     assert_eq!(result.feedback.len(), 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   resolve    ┌──────────────────────────────┐
//! │    Graph     │◀─────────────│           Executor           │
//! │ name → Node  │              │  state, current node, depth  │
//! └──────────────┘              └──────┬─────────────────┬─────┘
//!                                      │ put/get_latest  │ emit/close
//!                                      ▼                 ▼
//!                            ┌──────────────────┐ ┌────────────────┐
//!                            │ CheckpointStore  │ │   StreamSink   │
//!                            │ (clan-checkpoint)│ │ (bounded mpsc) │
//!                            └──────────────────┘ └────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod state;
pub mod stream;

// Re-export main types
pub use config::ExecutorConfig;
pub use error::{BoxError, GraphError, Result};
pub use executor::{execute_streaming, history, ExecuteOptions, Executor, DEFAULT_MAX_DEPTH};
pub use graph::{is_reserved, Graph, Node, NodeId, Selector, Target, Transition, END, PAUSE};
pub use state::GraphState;
pub use stream::{stream_channel, ChannelSink, SinkClosed, StateStream, StreamSink, StreamState};

pub use clan_checkpoint::{
    Checkpoint, CheckpointError, CheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore,
    StoreConfig,
};
