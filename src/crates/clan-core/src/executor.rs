//! Traversal loop: checkpoint, stream, transition, select, repeat
//!
//! One call to [`Executor::run`] walks the graph from its start node (or
//! from the latest checkpoint of the workflow) until it reaches
//! [`END`](crate::graph::END), [`PAUSE`](crate::graph::PAUSE) or an error.
//!
//! # Step order
//!
//! ```text
//!            ┌──────────── next node ◀──────────────────────┐
//!            ▼                                              │
//!   Pause? ──yes──▶ return (suspended)                      │
//!      │ no                                                 │
//!   checkpoint (node, state, depth)                         │
//!   emit (node, state)                                      │
//!   End? ───yes──▶ return (complete)                        │
//!      │ no                                                 │
//!   transition ─▶ selector ─▶ resolve ─▶ depth += 1, guard ─┘
//! ```
//!
//! The checkpoint is written *before* a node runs, so resuming re-runs the
//! node named in the latest checkpoint: at-least-once per node across a crash.
//!
//! # Example
//!
//! ```rust
//! use clan_core::{ExecuteOptions, Graph, InMemoryCheckpointStore, END, PAUSE};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> clan_core::Result<()> {
//! let approved = Arc::new(AtomicBool::new(false));
//! let flag = approved.clone();
//!
//! let mut graph: Graph<Vec<String>> = Graph::new();
//! graph.add_node("Draft", |mut s: Vec<String>| async move {
//!     s.push("draft".to_string());
//!     Ok(s)
//! });
//! graph.add_conditional_edge("Draft", move |_: &Vec<String>| {
//!     // wait for a human until the draft is approved
//!     Ok(if flag.load(Ordering::SeqCst) { END } else { PAUSE }.to_string())
//! })?;
//! graph.set_start_node("Draft")?;
//!
//! let store = Arc::new(InMemoryCheckpointStore::new());
//! let options = || {
//!     ExecuteOptions::new()
//!         .with_workflow_id("review-42")
//!         .with_checkpointer(store.clone())
//! };
//!
//! let paused = graph.execute(Vec::new(), options()).await?;
//! assert_eq!(paused, vec!["draft"]);
//!
//! // "Draft" runs again from the checkpoint taken before it
//! approved.store(true, Ordering::SeqCst);
//! let done = graph.execute(Vec::new(), options()).await?;
//! assert_eq!(done, vec!["draft"]);
//! # Ok(())
//! # }
//! ```

use crate::error::{GraphError, Result};
use crate::graph::{Graph, Target};
use crate::state::GraphState;
use crate::stream::{stream_channel, ChannelSink, StateStream, StreamSink, StreamState};
use clan_checkpoint::{Checkpoint, CheckpointStore};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Depth bound used when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Per-run configuration
pub struct ExecuteOptions<S> {
    /// Maximum number of transitions a run may complete
    pub max_depth: usize,
    /// Scopes checkpoints; required when `checkpointer` is set
    pub workflow_id: Option<String>,
    pub checkpointer: Option<Arc<dyn CheckpointStore>>,
    pub sink: Option<Box<dyn StreamSink<S>>>,
}

impl<S> ExecuteOptions<S> {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            workflow_id: None,
            checkpointer: None,
            sink: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_checkpointer(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpointer = Some(store);
        self
    }

    pub fn with_sink(mut self, sink: impl StreamSink<S> + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }
}

impl<S: Send + 'static> ExecuteOptions<S> {
    /// Stream per-step snapshots into a channel from [`stream_channel`]
    pub fn with_stream(self, tx: mpsc::Sender<StreamState<S>>) -> Self {
        self.with_sink(ChannelSink::new(tx))
    }
}

impl<S> Default for ExecuteOptions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for ExecuteOptions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("max_depth", &self.max_depth)
            .field("workflow_id", &self.workflow_id)
            .field("checkpointer", &self.checkpointer.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Closes the sink when the run ends, however it ends
struct SinkGuard<S> {
    sink: Option<Box<dyn StreamSink<S>>>,
}

impl<S: GraphState> SinkGuard<S> {
    async fn emit(&mut self, node_name: &str, state: &S) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if sink.emit(StreamState::new(node_name, state.clone())).await.is_err() {
            tracing::warn!(node = %node_name, "Stream consumer disconnected; no further events");
            if let Some(mut sink) = self.sink.take() {
                sink.close();
            }
        }
    }
}

impl<S> Drop for SinkGuard<S> {
    fn drop(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.close();
        }
    }
}

/// Drives runs over a borrowed [`Graph`]
pub struct Executor<'g, S> {
    graph: &'g Graph<S>,
}

impl<'g, S: GraphState> Executor<'g, S> {
    pub fn new(graph: &'g Graph<S>) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g Graph<S> {
        self.graph
    }

    /// Run the graph to `End` or `Pause`
    ///
    /// With a checkpoint store, the run resumes from the latest checkpoint of
    /// `workflow_id` when one exists, and `initial` is ignored. Errors abort
    /// the run without retry; invoke again with the same workflow id to
    /// resume.
    #[tracing::instrument(
        skip(self, initial, options),
        fields(workflow_id = ?options.workflow_id, max_depth = options.max_depth)
    )]
    pub async fn run(&self, initial: S, options: ExecuteOptions<S>) -> Result<S> {
        let ExecuteOptions {
            max_depth,
            workflow_id,
            checkpointer,
            sink,
        } = options;
        let mut sink = SinkGuard { sink };

        let start = self.graph.start_node().ok_or(GraphError::NoStartNode)?;
        let store = match checkpointer {
            Some(store) => {
                let workflow_id = workflow_id
                    .filter(|id| !id.is_empty())
                    .ok_or(GraphError::MissingWorkflowId)?;
                Some((workflow_id, store))
            }
            None => None,
        };
        let persistence: Option<(&str, &dyn CheckpointStore)> = store
            .as_ref()
            .map(|(workflow_id, store)| (workflow_id.as_str(), store.as_ref()));

        let (mut current, mut state, mut depth) = match persistence {
            Some((workflow_id, store)) => match store.get_latest(workflow_id).await? {
                Some(checkpoint) => {
                    let target = self.graph.require(&checkpoint.node_name)?;
                    let state = checkpoint.restore_state::<S>()?;
                    tracing::info!(
                        node = %checkpoint.node_name,
                        depth = checkpoint.depth,
                        "Resuming from checkpoint"
                    );
                    (target, state, checkpoint.depth)
                }
                None => (self.graph.require(start)?, initial, 0),
            },
            None => (self.graph.require(start)?, initial, 0),
        };

        tracing::info!(node = current.name(), depth, "Starting graph execution");

        loop {
            if let Target::Pause = current {
                tracing::info!(depth, "Graph execution paused");
                return Ok(state);
            }

            if let Some((workflow_id, store)) = persistence {
                let checkpoint = Checkpoint::from_state(current.name(), &state, depth)?;
                store.put(workflow_id, checkpoint).await?;
            }

            sink.emit(current.name(), &state).await;

            let node = match current {
                Target::Node(node) => node,
                Target::End => {
                    tracing::info!(depth, "Graph execution completed");
                    return Ok(state);
                }
                Target::Pause => return Ok(state),
            };

            let selector = node.selector().ok_or_else(|| GraphError::MissingSelector {
                node: node.name().to_string(),
            })?;

            // also covers max_depth 0 and checkpoints resumed past the bound
            if depth >= max_depth {
                return Err(GraphError::TraversalDepthExceeded { depth, max_depth });
            }

            tracing::debug!(node = node.name(), depth, "Running node");

            state = node
                .transition()
                .apply(state)
                .await
                .map_err(|source| GraphError::Transition {
                    node: node.name().to_string(),
                    source,
                })?;

            let next = selector
                .select(&state)
                .await
                .map_err(|source| GraphError::Selector {
                    node: node.name().to_string(),
                    source,
                })?;
            let next = self.graph.require(&next)?;

            depth += 1;
            if depth >= max_depth && !next.is_terminal() {
                return Err(GraphError::TraversalDepthExceeded { depth, max_depth });
            }

            tracing::debug!(from = node.name(), to = next.name(), depth, "Selected next node");
            current = next;
        }
    }

}

/// Every checkpoint recorded for `workflow_id`, oldest first
pub async fn history(store: &dyn CheckpointStore, workflow_id: &str) -> Result<Vec<Checkpoint>> {
    Ok(store.list_all(workflow_id).await?)
}

impl<S: GraphState> Graph<S> {
    /// Run this graph once; see [`Executor::run`]
    pub async fn execute(&self, initial: S, options: ExecuteOptions<S>) -> Result<S> {
        Executor::new(self).run(initial, options).await
    }
}

/// Run `graph` on a background task, streaming per-step snapshots
///
/// Any sink already set on `options` is replaced. The stream ends when the
/// run does; the final result comes from the join handle.
pub fn execute_streaming<S: GraphState>(
    graph: Arc<Graph<S>>,
    initial: S,
    options: ExecuteOptions<S>,
    buffer: usize,
) -> (JoinHandle<Result<S>>, StateStream<S>) {
    let (tx, events) = stream_channel(buffer);
    let options = options.with_stream(tx);
    let handle = tokio::spawn(async move { graph.execute(initial, options).await });
    (handle, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::graph::{END, PAUSE};
    use clan_checkpoint::InMemoryCheckpointStore;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Step = futures::future::Ready<std::result::Result<Vec<String>, BoxError>>;

    fn push(tag: &'static str) -> impl Fn(Vec<String>) -> Step + Send + Sync + 'static {
        move |mut s: Vec<String>| {
            s.push(tag.to_string());
            futures::future::ready(Ok(s))
        }
    }

    fn linear() -> Graph<Vec<String>> {
        let mut graph = Graph::new();
        graph.add_node("A", push("a")).add_node("B", push("b"));
        graph.add_edge("A", "B").unwrap();
        graph.add_edge("B", END).unwrap();
        graph.set_start_node("A").unwrap();
        graph
    }

    #[tokio::test]
    async fn test_linear_run() {
        let graph = linear();
        let result = graph.execute(Vec::new(), ExecuteOptions::new()).await.unwrap();
        assert_eq!(result, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_no_start_node() {
        let mut graph: Graph<Vec<String>> = Graph::new();
        graph.add_node("A", push("a"));
        let err = graph.execute(Vec::new(), ExecuteOptions::new()).await.unwrap_err();
        assert!(matches!(err, GraphError::NoStartNode));
    }

    #[tokio::test]
    async fn test_store_requires_workflow_id() {
        let graph = linear();
        let options =
            ExecuteOptions::new().with_checkpointer(Arc::new(InMemoryCheckpointStore::new()));
        let err = graph.execute(Vec::new(), options).await.unwrap_err();
        assert!(matches!(err, GraphError::MissingWorkflowId));
    }

    #[tokio::test]
    async fn test_store_rejects_empty_workflow_id() {
        let graph = linear();
        let store = Arc::new(InMemoryCheckpointStore::new());
        let options = ExecuteOptions::new()
            .with_workflow_id("")
            .with_checkpointer(store.clone());

        let err = graph.execute(Vec::new(), options).await.unwrap_err();
        assert!(matches!(err, GraphError::MissingWorkflowId));
        assert_eq!(store.checkpoint_count().await, 0);
    }

    #[tokio::test]
    async fn test_zero_depth_runs_no_transition() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut graph: Graph<u32> = Graph::new();
        graph.add_node("Loop", move |s: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(s + 1) }
        });
        graph.add_edge("Loop", "Loop").unwrap();
        graph.set_start_node("Loop").unwrap();

        let err = graph
            .execute(0, ExecuteOptions::new().with_max_depth(0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::TraversalDepthExceeded { depth: 0, max_depth: 0 }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resume_past_depth_bound_runs_no_transition() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut graph: Graph<u32> = Graph::new();
        graph.add_node("Loop", move |s: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(s + 1) }
        });
        graph.add_edge("Loop", "Loop").unwrap();
        graph.set_start_node("Loop").unwrap();

        let store = Arc::new(InMemoryCheckpointStore::new());
        store
            .put("wf", Checkpoint::new("Loop", "7", 10))
            .await
            .unwrap();

        let options = ExecuteOptions::new()
            .with_max_depth(5)
            .with_workflow_id("wf")
            .with_checkpointer(store.clone());
        let err = graph.execute(0, options).await.unwrap_err();
        assert!(matches!(
            err,
            GraphError::TraversalDepthExceeded { depth: 10, max_depth: 5 }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_checkpoints_are_pre_images() {
        let graph = linear();
        let store = Arc::new(InMemoryCheckpointStore::new());
        let options = ExecuteOptions::new()
            .with_workflow_id("wf")
            .with_checkpointer(store.clone());
        graph.execute(Vec::new(), options).await.unwrap();

        let records = history(store.as_ref(), "wf").await.unwrap();
        let steps: Vec<(&str, usize)> = records
            .iter()
            .map(|c| (c.node_name.as_str(), c.depth))
            .collect();
        assert_eq!(steps, vec![("A", 0), ("B", 1), ("End", 2)]);
        assert_eq!(records[0].state, "[]");
        assert_eq!(records[2].restore_state::<Vec<String>>().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_depth_guard_stops_before_extra_transition() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut graph: Graph<u32> = Graph::new();
        graph.add_node("Loop", move |s: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(s + 1) }
        });
        graph.add_edge("Loop", "Loop").unwrap();
        graph.set_start_node("Loop").unwrap();

        let err = graph
            .execute(0, ExecuteOptions::new().with_max_depth(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::TraversalDepthExceeded { depth: 5, max_depth: 5 }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_depth_bound_allows_reaching_end() {
        let graph = linear();
        let result = graph
            .execute(Vec::new(), ExecuteOptions::new().with_max_depth(2))
            .await
            .unwrap();
        assert_eq!(result, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_missing_selector_detected_before_transition() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut graph: Graph<u32> = Graph::new();
        graph.add_node("Dangling", move |s: u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(s) }
        });
        graph.set_start_node("Dangling").unwrap();

        let err = graph.execute(0, ExecuteOptions::new()).await.unwrap_err();
        assert!(matches!(err, GraphError::MissingSelector { ref node } if node == "Dangling"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_at_pause_returns_initial_state() {
        let mut graph: Graph<u32> = Graph::new();
        graph.set_start_node(PAUSE).unwrap();
        assert_eq!(graph.execute(7, ExecuteOptions::new()).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_sink_is_closed_on_error() {
        let mut graph: Graph<u32> = Graph::new();
        graph.add_node("Fail", |_: u32| async move { Err::<u32, BoxError>("boom".into()) });
        graph.add_edge("Fail", END).unwrap();
        graph.set_start_node("Fail").unwrap();

        let (tx, events) = stream_channel(4);
        let err = graph
            .execute(1, ExecuteOptions::new().with_stream(tx))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Transition { ref node, .. } if node == "Fail"));

        let received: Vec<_> = events.collect().await;
        assert_eq!(received, vec![StreamState::new("Fail", 1)]);
    }

    #[tokio::test]
    async fn test_dropped_consumer_does_not_abort_run() {
        let graph = linear();
        let (tx, events) = stream_channel(1);
        drop(events);

        let result = graph
            .execute(Vec::new(), ExecuteOptions::new().with_stream(tx))
            .await
            .unwrap();
        assert_eq!(result, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_execute_streaming() {
        let graph = Arc::new(linear());
        let (handle, events) = execute_streaming(graph, Vec::new(), ExecuteOptions::new(), 1);

        let names: Vec<String> = events.map(|e| e.node_name).collect().await;
        assert_eq!(names, vec!["A", "B", "End"]);
        assert_eq!(handle.await.unwrap().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_options_default() {
        let options: ExecuteOptions<u32> = ExecuteOptions::default();
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert!(options.workflow_id.is_none());
        assert_eq!(
            format!("{:?}", options),
            "ExecuteOptions { max_depth: 100, workflow_id: None, checkpointer: false, sink: false }"
        );
    }
}
