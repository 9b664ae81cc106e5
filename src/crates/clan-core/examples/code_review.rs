//! Programmer/reviewer loop with checkpointing and live progress
//!
//! Run with: `RUST_LOG=clan_core=debug cargo run --example code_review`

use async_trait::async_trait;
use clan_core::{
    execute_streaming, BoxError, ExecuteOptions, Graph, InMemoryCheckpointStore, Transition, END,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReviewState {
    task: String,
    drafts: Vec<String>,
    feedback: Vec<String>,
    approved: bool,
}

/// Stand-in for a model call that writes code for the task
struct Programmer;

#[async_trait]
impl Transition<ReviewState> for Programmer {
    async fn apply(&self, mut state: ReviewState) -> Result<ReviewState, BoxError> {
        let revision = state.drafts.len() + 1;
        let draft = match state.feedback.last() {
            Some(note) => format!("fn solve() {{ /* v{}: {} */ }}", revision, note),
            None => format!("fn solve() {{ /* v{}: {} */ }}", revision, state.task),
        };
        state.drafts.push(draft);
        Ok(state)
    }
}

/// Approves the second draft
struct Reviewer;

#[async_trait]
impl Transition<ReviewState> for Reviewer {
    async fn apply(&self, mut state: ReviewState) -> Result<ReviewState, BoxError> {
        state.approved = state.drafts.len() >= 2;
        if !state.approved {
            state.feedback.push("handle empty input".to_string());
        }
        Ok(state)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut graph: Graph<ReviewState> = Graph::new();
    graph
        .add_node_with("Programmer", Programmer)
        .add_node_with("Reviewer", Reviewer);
    graph.add_edge("Programmer", "Reviewer")?;
    graph.add_conditional_edge("Reviewer", |state: &ReviewState| {
        Ok(if state.approved { END } else { "Programmer" }.to_string())
    })?;
    graph.set_start_node("Programmer")?;
    graph.validate()?;

    let store = Arc::new(InMemoryCheckpointStore::new());
    let options = ExecuteOptions::new()
        .with_workflow_id("code-review-1")
        .with_checkpointer(store.clone());
    let initial = ReviewState {
        task: "parse a CSV line".to_string(),
        ..Default::default()
    };

    let (handle, mut events) = execute_streaming(Arc::new(graph), initial, options, 4);
    while let Some(event) = events.next().await {
        println!(
            "-> {:<10} drafts={} feedback={}",
            event.node_name,
            event.state.drafts.len(),
            event.state.feedback.len()
        );
    }

    let result = handle.await??;
    println!("final draft: {}", result.drafts.last().map_or("-", String::as_str));
    println!("checkpoints written: {}", store.checkpoint_count().await);
    Ok(())
}
