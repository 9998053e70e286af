//! State graph builder: nodes, fixed edges, conditional edges over a schema.
//!
//! Add nodes with `add_node` (or `add_node_fn` / `add_subgraph`), wire them
//! with `add_edge(from, to)` using `START` and `END` for entry/exit, branch
//! with `add_conditional_edges`, then `compile` (or
//! `compile_with_checkpointer`) to freeze an executable [`CompiledGraph`].
//!
//! Unlike a linear chain, a node may have any number of outgoing fixed edges
//! *and* a conditional edge; every target reached in one routing round runs
//! in the same super-step.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::NodeError;
use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::CompiledGraph;
use crate::graph::conditional::{ConditionalEdge, RouterFn};
use crate::graph::node::{FnNode, Node, NodeOutput, SubgraphNode};
use crate::memory::CheckpointStore;
use crate::state::{GraphState, StateSchema};

/// Entry pseudo-node: use as `from` in `add_edge(START, first)`. Never
/// executed.
pub const START: &str = "__start__";

/// Terminal pseudo-node: use as `to` in `add_edge(last, END)`. Reaching it
/// ends the execution.
pub const END: &str = "__end__";

/// Mutable draft of a graph: schema plus nodes and edges.
///
/// Owns the node functions by name until `compile` discards the draft and
/// produces an immutable, freely shareable [`CompiledGraph`]. Registering a
/// node under an existing name replaces it.
pub struct StateGraph {
    schema: StateSchema,
    nodes: HashMap<String, Arc<dyn Node>>,
    /// Fixed edges in insertion order; a source may appear many times.
    edges: Vec<(String, String)>,
    conditional_edges: HashMap<String, ConditionalEdge>,
}

impl StateGraph {
    /// Creates an empty draft over `schema`.
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema,
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
        }
    }

    /// Registers a node; replaces any node with the same name.
    pub fn add_node(&mut self, name: impl Into<String>, node: Arc<dyn Node>) -> &mut Self {
        self.nodes.insert(name.into(), node);
        self
    }

    /// Registers a zero-context async closure as a node.
    pub fn add_node_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(GraphState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<NodeOutput, NodeError>> + Send + 'static,
    {
        self.add_node(name, Arc::new(FnNode::new(f)))
    }

    /// Registers a compiled graph as a node. The child runs its own complete
    /// execution; its final state merges through this graph's reducers.
    pub fn add_subgraph(&mut self, name: impl Into<String>, graph: CompiledGraph) -> &mut Self {
        self.add_node(name, Arc::new(SubgraphNode::new(graph)))
    }

    /// Appends a fixed edge from `from` to `to`, preserving insertion order.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Sugar for pairwise `add_edge` over consecutive names.
    pub fn add_sequence<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for pair in names.windows(2) {
            self.add_edge(pair[0].clone(), pair[1].clone());
        }
        self
    }

    /// Attaches a conditional edge to `from`: after the node runs, `router`
    /// is called with the post-step state; its result names the next
    /// frontier entries, optionally through `mapping`.
    ///
    /// Mapping values are not validated at compile time; a router result
    /// absent from the mapping fails the invocation.
    pub fn add_conditional_edges(
        &mut self,
        from: impl Into<String>,
        router: RouterFn,
        mapping: Option<HashMap<String, String>>,
    ) -> &mut Self {
        self.conditional_edges
            .insert(from.into(), ConditionalEdge::new(router, mapping));
        self
    }

    /// Freezes the draft into an executable graph.
    ///
    /// Fatal validation: no node may shadow `START`/`END`; every fixed-edge
    /// endpoint and conditional source must be a registered node or a
    /// distinguished name; `START` must have at least one outgoing fixed or
    /// conditional edge.
    pub fn compile(self) -> Result<CompiledGraph, CompilationError> {
        self.compile_internal(None)
    }

    /// Like [`compile`](Self::compile), with a checkpoint store attached.
    /// When invoked with a `thread_id`, every super-step persists a
    /// checkpoint through the store.
    pub fn compile_with_checkpointer(
        self,
        checkpointer: Arc<dyn CheckpointStore>,
    ) -> Result<CompiledGraph, CompilationError> {
        self.compile_internal(Some(checkpointer))
    }

    fn compile_internal(
        self,
        checkpointer: Option<Arc<dyn CheckpointStore>>,
    ) -> Result<CompiledGraph, CompilationError> {
        for name in self.nodes.keys() {
            if name == START || name == END {
                return Err(CompilationError::ReservedNodeName(name.clone()));
            }
        }

        let known =
            |name: &str| name == START || name == END || self.nodes.contains_key(name);
        for (from, to) in &self.edges {
            if !known(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if !known(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }
        for source in self.conditional_edges.keys() {
            if !known(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
        }

        let start_has_edge = self.edges.iter().any(|(from, _)| from == START)
            || self.conditional_edges.contains_key(START);
        if !start_has_edge {
            return Err(CompilationError::MissingStart);
        }

        let mut edges: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in self.edges {
            edges.entry(from).or_default().push(to);
        }

        let (initial_state, reducers) = self.schema.parse();

        Ok(CompiledGraph {
            nodes: self.nodes,
            edges,
            conditional_edges: self.conditional_edges,
            initial_state,
            reducers,
            checkpointer,
        })
    }
}
