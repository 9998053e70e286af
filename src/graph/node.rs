//! Graph node contract: one computation in a super-step.
//!
//! A node receives the current state (read it, never mutate it) plus a
//! [`NodeContext`] and returns a [`NodeOutput`]: a partial update merged
//! through the schema's reducers, or a [`Command`] combining an update with
//! explicit next-node targets. A node may instead suspend via
//! [`interrupt`](super::interrupt::interrupt).
//!
//! Closures adapt through [`FnNode`] (zero-context convenience); a compiled
//! graph adapts through [`SubgraphNode`].

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::NodeError;
use crate::graph::compiled::{CompiledGraph, InvokeOptions, RunOutcome};
use crate::memory::RunnableConfig;
use crate::state::{GraphState, StateUpdate};

/// Context handed to every node invocation.
///
/// Carries the invocation config and the caller's opaque context value.
/// Cheap to clone; nodes must treat it as read-only.
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    /// Config for the current invocation (thread id, backend extras).
    pub config: RunnableConfig,
    context: Option<Arc<Value>>,
}

impl NodeContext {
    /// Creates a context for `config`.
    pub fn new(config: RunnableConfig) -> Self {
        Self {
            config,
            context: None,
        }
    }

    /// Attaches the caller's opaque context value.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    /// Returns the caller's opaque context value, if any.
    pub fn context(&self) -> Option<&Value> {
        self.context.as_deref()
    }
}

/// A node return combining a state update with explicit next-node targets.
///
/// The update merges like any other; the `goto` targets are added to the
/// next frontier *ahead of* edge-derived entries, in addition to any edges
/// leaving the node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    /// Partial update merged through the reducers.
    pub update: StateUpdate,
    /// Zero, one, or many next nodes.
    pub goto: Vec<String>,
}

impl Command {
    /// Creates a command carrying `update` and no targets.
    pub fn new(update: StateUpdate) -> Self {
        Self {
            update,
            goto: Vec::new(),
        }
    }

    /// Adds a target, returning `self` for chaining.
    pub fn goto(mut self, node: impl Into<String>) -> Self {
        self.goto.push(node.into());
        self
    }
}

/// What a node returns: a plain update or a command.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    /// Partial state update, merged through reducers.
    Update(StateUpdate),
    /// Update plus explicit next-node targets.
    Command(Command),
}

impl NodeOutput {
    /// A plain update output.
    pub fn update(update: StateUpdate) -> Self {
        NodeOutput::Update(update)
    }

    /// A command output with targets.
    pub fn command<I, S>(update: StateUpdate, goto: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NodeOutput::Command(Command {
            update,
            goto: goto.into_iter().map(Into::into).collect(),
        })
    }

    /// Splits into `(update, goto)`.
    pub(crate) fn into_parts(self) -> (StateUpdate, Vec<String>) {
        match self {
            NodeOutput::Update(update) => (update, Vec::new()),
            NodeOutput::Command(command) => (command.update, command.goto),
        }
    }
}

impl From<StateUpdate> for NodeOutput {
    fn from(update: StateUpdate) -> Self {
        NodeOutput::Update(update)
    }
}

/// One computation in a super-step: state in, partial update out.
///
/// Implementations must be pure with respect to the received state (return
/// updates instead of expecting in-place mutation) and must not spawn tasks
/// that outlive the call. Registered in a graph via `StateGraph::add_node`.
#[async_trait]
pub trait Node: Send + Sync {
    /// Runs the node on a snapshot of the current state.
    async fn run(&self, state: GraphState, ctx: NodeContext) -> Result<NodeOutput, NodeError>;
}

/// Adapts a zero-context async closure into a [`Node`].
///
/// The single callable contract stays `(state, ctx)`; this wrapper merely
/// drops the context for closures that do not need it — there is no runtime
/// arity detection.
pub struct FnNode<F> {
    f: F,
}

impl<F, Fut> FnNode<F>
where
    F: Fn(GraphState) -> Fut + Send + Sync,
    Fut: Future<Output = Result<NodeOutput, NodeError>> + Send + 'static,
{
    /// Wraps `f` as a node.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Node for FnNode<F>
where
    F: Fn(GraphState) -> Fut + Send + Sync,
    Fut: Future<Output = Result<NodeOutput, NodeError>> + Send + 'static,
{
    async fn run(&self, state: GraphState, _ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        (self.f)(state).await
    }
}

/// A compiled graph used as a node of another graph.
///
/// The child runs its own complete execution on the state passed in; the
/// parent's reducers do not apply inside it. The child's final state is
/// returned as this node's update and merges through the *parent's*
/// reducers.
///
/// A child interrupt does not surface as a resumable interrupt of the
/// parent: it is reported as a node failure.
pub struct SubgraphNode {
    graph: Arc<CompiledGraph>,
}

impl SubgraphNode {
    /// Wraps `graph` as a node.
    pub fn new(graph: CompiledGraph) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }
}

#[async_trait]
impl Node for SubgraphNode {
    async fn run(&self, state: GraphState, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        let mut options = InvokeOptions::default();
        if let Some(context) = ctx.context() {
            options = options.with_context(context.clone());
        }
        match self.graph.invoke(StateUpdate::from(state), options).await {
            Ok(RunOutcome::Complete(final_state)) => {
                Ok(NodeOutput::Update(StateUpdate::from(final_state)))
            }
            Ok(RunOutcome::Interrupted { value, .. }) => Err(NodeError::Failed(format!(
                "subgraph interrupted: {}",
                value
            ))),
            Err(error) => Err(NodeError::Failed(error.to_string())),
        }
    }
}
