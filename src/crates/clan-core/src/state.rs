//! Bounds on the caller-defined execution state

use serde::{de::DeserializeOwned, Serialize};

/// Execution state carried through a traversal
///
/// The engine never looks inside the state. It needs to hand it to
/// transitions across tasks, snapshot it for stream sinks, and encode it for
/// checkpoint stores. Implemented for every type that meets those bounds.
///
/// ```rust
/// use clan_core::GraphState;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Default, Serialize, Deserialize)]
/// struct ReviewState {
///     code: String,
///     feedback: Vec<String>,
/// }
///
/// fn assert_state<S: GraphState>() {}
/// assert_state::<ReviewState>();
/// ```
pub trait GraphState: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> GraphState for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}
