//! Error types for graph construction and execution
//!
//! Every failure aborts the run that produced it and is handed back to the
//! caller of [`Executor::run`](crate::executor::Executor::run) unchanged. The
//! engine never retries; the caller recovers by invoking the run again with
//! the same workflow id and store, which resumes from the last checkpoint.
//!
//! # Error Categories
//!
//! - **Construction**: `NoStartNode`, `NodeNotFound`, `MissingSelector`
//! - **Configuration**: `MissingWorkflowId`, `Configuration`, `Yaml`, `Io`
//! - **Persistence**: `Serialization`, `Store`
//! - **Traversal**: `TraversalDepthExceeded`
//! - **Collaborators**: `Transition`, `Selector`
//!
//! # Matching Errors
//!
//! ```rust
//! use clan_core::GraphError;
//!
//! fn describe(err: &GraphError) -> String {
//!     match err {
//!         GraphError::TraversalDepthExceeded { max_depth, .. } => {
//!             format!("gave up after {} steps", max_depth)
//!         }
//!         GraphError::Transition { node, source } => {
//!             format!("{} failed: {}", node, source)
//!         }
//!         other => other.to_string(),
//!     }
//! }
//!
//! let err = GraphError::TraversalDepthExceeded { depth: 5, max_depth: 5 };
//! assert_eq!(describe(&err), "gave up after 5 steps");
//! ```

use clan_checkpoint::CheckpointError;
use thiserror::Error;

/// Opaque failure returned by caller-supplied transitions and selectors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience result type using [`GraphError`]
pub type Result<T> = std::result::Result<T, GraphError>;

/// Error type for all graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    /// A run was started before any start node was configured
    #[error("start node not defined")]
    NoStartNode,

    /// An edge, a resume target or a selector result names an unknown node
    ///
    /// Resuming a checkpoint taken before the graph was changed is the usual
    /// way to hit this at run time.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Checkpointing was requested without a workflow id
    #[error("in order to checkpoint, you must pass a workflow id")]
    MissingWorkflowId,

    /// A node that the traversal reached has no selector bound
    #[error("node '{node}' has no outgoing edge")]
    MissingSelector {
        /// Node without a selector
        node: String,
    },

    /// The state snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The checkpoint store failed a read or write
    #[error("Checkpoint store error: {0}")]
    Store(#[source] CheckpointError),

    /// Another transition was required after `max_depth` had completed
    #[error("Traversal depth exceeded {max_depth}")]
    TraversalDepthExceeded {
        /// Completed transitions when the run was stopped
        depth: usize,
        /// Configured bound
        max_depth: usize,
    },

    /// A node's transition function failed
    #[error("Node '{node}' transition failed: {source}")]
    Transition {
        /// Node whose transition failed
        node: String,
        /// Error returned by the transition, untouched
        #[source]
        source: BoxError,
    },

    /// A node's selector function failed
    #[error("Node '{node}' selector failed: {source}")]
    Selector {
        /// Node whose selector failed
        node: String,
        /// Error returned by the selector, untouched
        #[source]
        source: BoxError,
    },

    /// Run configuration is invalid
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Run configuration could not be parsed
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Run configuration could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Name of the node the error is attributed to, if any
    pub fn node(&self) -> Option<&str> {
        match self {
            GraphError::NodeNotFound(node)
            | GraphError::MissingSelector { node }
            | GraphError::Transition { node, .. }
            | GraphError::Selector { node, .. } => Some(node),
            _ => None,
        }
    }
}

impl From<CheckpointError> for GraphError {
    fn from(err: CheckpointError) -> Self {
        match err {
            CheckpointError::Serialization(e) => GraphError::Serialization(e),
            other => GraphError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct ApiTimeout;

    impl std::fmt::Display for ApiTimeout {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "API timeout")
        }
    }

    impl std::error::Error for ApiTimeout {}

    #[test]
    fn test_transition_error_keeps_source() {
        let err = GraphError::Transition {
            node: "Programmer".to_string(),
            source: Box::new(ApiTimeout),
        };

        assert_eq!(err.to_string(), "Node 'Programmer' transition failed: API timeout");
        assert_eq!(err.node(), Some("Programmer"));

        let source = err.source().unwrap();
        assert!(source.downcast_ref::<ApiTimeout>().is_some());
    }

    #[test]
    fn test_checkpoint_serialization_maps_to_serialization() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: GraphError = CheckpointError::Serialization(json_err).into();
        assert!(matches!(err, GraphError::Serialization(_)));
    }

    #[test]
    fn test_checkpoint_storage_maps_to_store() {
        let err: GraphError = CheckpointError::Storage("disk full".to_string()).into();
        assert!(matches!(err, GraphError::Store(_)));
        assert_eq!(err.to_string(), "Checkpoint store error: Storage error: disk full");
    }

    #[test]
    fn test_depth_exceeded_display() {
        let err = GraphError::TraversalDepthExceeded { depth: 5, max_depth: 5 };
        assert_eq!(err.to_string(), "Traversal depth exceeded 5");
        assert_eq!(err.node(), None);
    }
}
