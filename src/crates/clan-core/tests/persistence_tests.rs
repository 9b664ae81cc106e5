//! Runs backed by durable checkpoint stores

use clan_core::{
    BoxError, CheckpointStore, ExecuteOptions, ExecutorConfig, Graph, GraphError,
    SqliteCheckpointStore, StoreConfig, END,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ReviewState {
    code: String,
    feedback: Vec<String>,
}

/// Programmer -> Reviewer -> (Programmer | End); the reviewer can be made to fail once
fn review_graph(reviewer_down: Arc<AtomicBool>) -> Graph<ReviewState> {
    let mut graph = Graph::new();
    graph.add_node("Programmer", |mut state: ReviewState| async move {
        state.code.push_str("// revision\n");
        Ok(state)
    });
    graph.add_node("Reviewer", move |mut state: ReviewState| {
        let down = reviewer_down.swap(false, Ordering::SeqCst);
        async move {
            if down {
                return Err::<ReviewState, BoxError>("reviewer API timeout".into());
            }
            state.feedback.push(format!("round {}", state.feedback.len() + 1));
            Ok(state)
        }
    });
    graph.add_edge("Programmer", "Reviewer").unwrap();
    graph
        .add_conditional_edge("Reviewer", |state: &ReviewState| {
            Ok(if state.feedback.len() < 2 { "Programmer" } else { END }.to_string())
        })
        .unwrap();
    graph.set_start_node("Programmer").unwrap();
    graph
}

/// Test that a run survives a process restart through the SQLite store
#[tokio::test]
async fn test_sqlite_resume_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checkpoints.db");
    let down = Arc::new(AtomicBool::new(true));
    let graph = review_graph(down.clone());

    {
        let store = Arc::new(SqliteCheckpointStore::open(&path).unwrap());
        let options = ExecuteOptions::new()
            .with_workflow_id("review-1")
            .with_checkpointer(store);
        let err = graph.execute(ReviewState::default(), options).await.unwrap_err();
        assert!(matches!(err, GraphError::Transition { ref node, .. } if node == "Reviewer"));
    }

    let store = Arc::new(SqliteCheckpointStore::open(&path).unwrap());
    let latest = store.get_latest("review-1").await.unwrap().unwrap();
    assert_eq!(latest.node_name, "Reviewer");
    assert_eq!(latest.depth, 1);

    let options = ExecuteOptions::new()
        .with_workflow_id("review-1")
        .with_checkpointer(store.clone());
    let result = graph.execute(ReviewState::default(), options).await.unwrap();
    assert_eq!(result.feedback, vec!["round 1", "round 2"]);
    assert_eq!(result.code.matches("// revision").count(), 2);

    let nodes: Vec<String> = store
        .list_all("review-1")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.node_name)
        .collect();
    assert_eq!(
        nodes,
        vec!["Programmer", "Reviewer", "Reviewer", "Programmer", "Reviewer", "End"]
    );
}

/// Test that workflows sharing one database do not see each other's progress
#[tokio::test]
async fn test_sqlite_workflow_isolation() {
    let store = Arc::new(SqliteCheckpointStore::open_in_memory().unwrap());
    let graph = review_graph(Arc::new(AtomicBool::new(false)));

    for workflow_id in ["review-a", "review-b"] {
        let options = ExecuteOptions::new()
            .with_workflow_id(workflow_id)
            .with_checkpointer(store.clone());
        let result = graph.execute(ReviewState::default(), options).await.unwrap();
        assert_eq!(result.feedback.len(), 2);
    }

    assert_eq!(store.list_all("review-a").await.unwrap().len(), 5);
    assert_eq!(store.list_all("review-b").await.unwrap().len(), 5);
}

/// Test that options loaded from YAML drive a checkpointed run
#[tokio::test]
async fn test_run_from_yaml_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("run.db");
    let yaml = format!(
        "max_depth: 10\nworkflow_id: review-yaml\ncheckpointer:\n  kind: sqlite3\n  connection: {}\n",
        path.display()
    );

    let config = ExecutorConfig::from_yaml_str(&yaml).unwrap();
    assert_eq!(
        config.checkpointer,
        Some(StoreConfig::new("sqlite3", path.display().to_string()))
    );

    let graph = review_graph(Arc::new(AtomicBool::new(false)));
    let result = graph
        .execute(ReviewState::default(), config.into_options().unwrap())
        .await
        .unwrap();
    assert_eq!(result.feedback.len(), 2);

    let store = SqliteCheckpointStore::open(&path).unwrap();
    let latest = store.get_latest("review-yaml").await.unwrap().unwrap();
    assert_eq!(latest.node_name, END);
    assert_eq!(latest.depth, 4);
    assert_eq!(latest.restore_state::<ReviewState>().unwrap(), result);
}

/// Test that a depth bound from configuration stops the review loop
#[tokio::test]
async fn test_config_depth_bound() {
    let config = ExecutorConfig::from_yaml_str("max_depth: 3\n").unwrap();
    let graph = review_graph(Arc::new(AtomicBool::new(false)));

    let err = graph
        .execute(ReviewState::default(), config.into_options().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::TraversalDepthExceeded { depth: 3, max_depth: 3 }
    ));
}
