//! Graph registry: named nodes, their transitions and their selectors
//!
//! A [`Graph`] maps node names to [`Node`] records. Each node pairs a
//! [`Transition`] (state in, state out) with a [`Selector`] that picks the
//! next node by name from the state the transition produced. The registry owns
//! every node outright and nodes never point back at the graph, so a built
//! graph can be shared by reference across any number of concurrent runs.
//!
//! # Reserved terminals
//!
//! Two names are resolvable in every graph without being registered:
//!
//! - [`END`] (`"End"`) - the traversal completed
//! - [`PAUSE`] (`"Pause"`) - the traversal suspended; a later run with the
//!   same workflow id picks up where it stopped
//!
//! Internally they are the [`Target::End`] and [`Target::Pause`] variants and
//! take precedence over any user node registered under the same name. That
//! matches re-installing them fresh at the start of every run. Their literal
//! names are what checkpoints store.
//!
//! # Overwrite semantics
//!
//! Registering a name twice silently replaces the earlier node, including its
//! selector.
//!
//! # Example
//!
//! ```rust
//! use clan_core::{Graph, END};
//!
//! let mut graph: Graph<Vec<String>> = Graph::new();
//! graph
//!     .add_node("Programmer", |mut state: Vec<String>| async move {
//!         state.push("code".to_string());
//!         Ok(state)
//!     })
//!     .add_node("Reviewer", |mut state: Vec<String>| async move {
//!         state.push("review".to_string());
//!         Ok(state)
//!     });
//!
//! graph.add_edge("Programmer", "Reviewer").unwrap();
//! graph
//!     .add_conditional_edge("Reviewer", |state: &Vec<String>| {
//!         Ok(if state.len() < 4 { "Programmer" } else { END }.to_string())
//!     })
//!     .unwrap();
//! graph.set_start_node("Programmer").unwrap();
//!
//! assert!(graph.validate().is_ok());
//! ```

use crate::error::{BoxError, GraphError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;

/// Node identifier - unique name for each node in the graph
pub type NodeId = String;

/// Reserved terminal marking successful completion
pub const END: &str = "End";

/// Reserved terminal marking a resumable suspension
pub const PAUSE: &str = "Pause";

/// Whether `name` is one of the reserved terminal names
pub fn is_reserved(name: &str) -> bool {
    name == END || name == PAUSE
}

/// State-transition function of a node
///
/// Receives the state by value and hands back the next state. Implemented for
/// async closures through [`Graph::add_node`]; implement it directly for
/// transitions that carry their own configuration.
#[async_trait]
pub trait Transition<S>: Send + Sync {
    async fn apply(&self, state: S) -> std::result::Result<S, BoxError>;
}

/// Next-node selector of a node
///
/// Called with the state produced by the node's transition; returns the name
/// of the node to visit next, which may be [`END`] or [`PAUSE`]. Selectors can
/// await (asking a language model which agent goes next, say); synchronous
/// selectors go through [`Graph::add_conditional_edge`].
#[async_trait]
pub trait Selector<S>: Send + Sync {
    async fn select(&self, state: &S) -> std::result::Result<NodeId, BoxError>;
}

struct FnTransition<F>(F);

#[async_trait]
impl<S, F, Fut> Transition<S> for FnTransition<F>
where
    S: Send + 'static,
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<S, BoxError>> + Send + 'static,
{
    async fn apply(&self, state: S) -> std::result::Result<S, BoxError> {
        (self.0)(state).await
    }
}

struct FnSelector<F>(F);

#[async_trait]
impl<S, F> Selector<S> for FnSelector<F>
where
    S: Sync + 'static,
    F: Fn(&S) -> std::result::Result<NodeId, BoxError> + Send + Sync,
{
    async fn select(&self, state: &S) -> std::result::Result<NodeId, BoxError> {
        (self.0)(state)
    }
}

/// A registered unit of work
pub struct Node<S> {
    name: NodeId,
    transition: Box<dyn Transition<S>>,
    selector: Option<Box<dyn Selector<S>>>,
}

impl<S> Node<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transition(&self) -> &dyn Transition<S> {
        self.transition.as_ref()
    }

    /// The bound selector, or `None` if no edge leaves this node yet
    pub fn selector(&self) -> Option<&dyn Selector<S>> {
        self.selector.as_deref()
    }

    pub fn has_selector(&self) -> bool {
        self.selector.is_some()
    }
}

impl<S> fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("transition", &"<function>")
            .field("selector", &self.selector.as_ref().map(|_| "<function>"))
            .finish()
    }
}

/// A resolved traversal position: a registered node or a reserved terminal
pub enum Target<'g, S> {
    Node(&'g Node<S>),
    End,
    Pause,
}

impl<'g, S> Target<'g, S> {
    /// Literal name, as written to checkpoints and stream events
    pub fn name(&self) -> &'g str {
        match *self {
            Target::Node(node) => &node.name,
            Target::End => END,
            Target::Pause => PAUSE,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Target::Node(_))
    }
}

impl<S> Clone for Target<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Target<'_, S> {}

impl<S> fmt::Debug for Target<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(node) => f.debug_tuple("Node").field(&node.name).finish(),
            Target::End => f.write_str("End"),
            Target::Pause => f.write_str("Pause"),
        }
    }
}

/// Registry of named nodes plus the configured start node
pub struct Graph<S> {
    nodes: HashMap<NodeId, Node<S>>,
    start: Option<NodeId>,
}

impl<S> Graph<S> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            start: None,
        }
    }

    /// Look up a registered node by name
    pub fn lookup(&self, name: &str) -> Option<&Node<S>> {
        self.nodes.get(name)
    }

    /// Resolve a name to a traversal target
    ///
    /// Reserved terminal names resolve ahead of registered nodes.
    pub fn resolve(&self, name: &str) -> Option<Target<'_, S>> {
        match name {
            END => Some(Target::End),
            PAUSE => Some(Target::Pause),
            _ => self.nodes.get(name).map(Target::Node),
        }
    }

    /// Resolve a name, failing with [`GraphError::NodeNotFound`]
    pub fn require(&self, name: &str) -> Result<Target<'_, S>> {
        self.resolve(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))
    }

    /// Whether `name` resolves (registered or reserved)
    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Names of the registered nodes, in no particular order
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Number of registered nodes (reserved terminals excluded)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Configured start node, if any
    pub fn start_node(&self) -> Option<&str> {
        self.start.as_deref()
    }

    /// Record the node the next fresh run starts from
    ///
    /// Fails with [`GraphError::NodeNotFound`] if `name` does not resolve.
    pub fn set_start_node(&mut self, name: &str) -> Result<&mut Self> {
        self.require(name)?;
        self.start = Some(name.to_string());
        Ok(self)
    }

    /// Check the graph before running it
    ///
    /// Fails if there is no start node, or if any registered node has no
    /// selector. Nodes shadowed by a reserved terminal never run and are
    /// skipped. Nodes are checked in name order so the reported node is
    /// stable.
    pub fn validate(&self) -> Result<()> {
        let start = self.start.as_deref().ok_or(GraphError::NoStartNode)?;
        self.require(start)?;

        let mut names: Vec<&str> = self.node_names().filter(|n| !is_reserved(n)).collect();
        names.sort_unstable();
        for name in names {
            if !self.nodes[name].has_selector() {
                return Err(GraphError::MissingSelector {
                    node: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut Node<S>> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))
    }
}

impl<S: Send + Sync + 'static> Graph<S> {
    /// Register (or replace) a node whose transition is an async closure
    ///
    /// The new node has no selector; bind one with [`add_edge`](Self::add_edge)
    /// or [`add_conditional_edge`](Self::add_conditional_edge).
    pub fn add_node<F, Fut>(&mut self, name: impl Into<NodeId>, transition: F) -> &mut Self
    where
        F: Fn(S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<S, BoxError>> + Send + 'static,
    {
        self.add_node_with(name, FnTransition(transition))
    }

    /// Register (or replace) a node with a [`Transition`] implementation
    pub fn add_node_with(
        &mut self,
        name: impl Into<NodeId>,
        transition: impl Transition<S> + 'static,
    ) -> &mut Self {
        let name = name.into();
        if is_reserved(&name) {
            tracing::warn!(node = %name, "Node shadowed by reserved terminal; it will never run");
        }

        let node = Node {
            name: name.clone(),
            transition: Box::new(transition),
            selector: None,
        };
        if self.nodes.insert(name.clone(), node).is_some() {
            tracing::debug!(node = %name, "Replaced existing node");
        }
        self
    }

    /// Bind a synchronous selector to `name`
    ///
    /// Fails with [`GraphError::NodeNotFound`] if `name` is not registered.
    pub fn add_conditional_edge<F>(&mut self, name: &str, selector: F) -> Result<&mut Self>
    where
        F: Fn(&S) -> std::result::Result<NodeId, BoxError> + Send + Sync + 'static,
    {
        self.add_selector(name, FnSelector(selector))
    }

    /// Bind a [`Selector`] implementation to `name`
    pub fn add_selector(
        &mut self,
        name: &str,
        selector: impl Selector<S> + 'static,
    ) -> Result<&mut Self> {
        self.node_mut(name)?.selector = Some(Box::new(selector));
        Ok(self)
    }

    /// Unconditional edge: `from` always continues to `to`
    ///
    /// `to` is resolved when the edge is taken, not when it is added, so edges
    /// may point at nodes registered later.
    pub fn add_edge(&mut self, from: &str, to: impl Into<NodeId>) -> Result<&mut Self> {
        let to = to.into();
        self.add_conditional_edge(from, move |_: &S| Ok(to.clone()))
    }
}

impl<S> Default for Graph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Graph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.node_names().collect();
        names.sort_unstable();
        f.debug_struct("Graph")
            .field("nodes", &names)
            .field("start", &self.start)
            .finish()
    }
}
