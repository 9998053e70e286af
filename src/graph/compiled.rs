//! Compiled graph: immutable, shareable, supports invoke and stream.
//!
//! Built by `StateGraph::compile` / `compile_with_checkpointer`. Holds the
//! nodes, edge maps, parsed schema, and optional checkpoint store. `invoke`
//! runs to a terminal outcome; `stream` exposes the same execution as a lazy
//! event sequence.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::GraphError;
use crate::graph::conditional::ConditionalEdge;
use crate::graph::logging::log_graph_error;
use crate::graph::node::{Node, NodeContext};
use crate::graph::runtime::{Engine, DEFAULT_RECURSION_LIMIT};
use crate::memory::{CheckpointStore, RunnableConfig};
use crate::state::{apply_update, GraphState, ReducerMap, StateUpdate};
use crate::stream::{EventStream, ExecutionEvent, StreamOutcome};

/// Input to one invocation: a plain state update, or a resume command
/// carrying the value that the pending `interrupt` call will return.
#[derive(Debug, Clone)]
pub enum GraphInput {
    /// Merged into the base state through the reducers before step 0.
    Update(StateUpdate),
    /// Continue the thread's interrupted execution with this value.
    Resume(Value),
}

impl GraphInput {
    /// A resume command.
    pub fn resume(value: impl Into<Value>) -> Self {
        GraphInput::Resume(value.into())
    }
}

impl From<StateUpdate> for GraphInput {
    fn from(update: StateUpdate) -> Self {
        GraphInput::Update(update)
    }
}

/// Options for one invocation.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// Super-step bound; counts super-steps, not nodes or edges.
    pub recursion_limit: usize,
    /// Thread identity and backend extras.
    pub config: RunnableConfig,
    /// Opaque caller context handed to every node.
    pub context: Option<Value>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            config: RunnableConfig::default(),
            context: None,
        }
    }
}

impl InvokeOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the super-step bound.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Sets the invocation config.
    pub fn with_config(mut self, config: RunnableConfig) -> Self {
        self.config = config;
        self
    }

    /// Shorthand: sets `config.thread_id`.
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.config.thread_id = Some(thread_id.into());
        self
    }

    /// Sets the opaque context value handed to nodes.
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Terminal outcome of an invocation that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The graph reached `__end__` (or an empty frontier).
    Complete(GraphState),
    /// A node called `interrupt`; a checkpoint was persisted when a store
    /// and thread id were configured.
    Interrupted {
        /// Payload the node surfaced to the caller.
        value: Value,
        /// State at the pause (pre-step, managed key stripped).
        state: GraphState,
    },
}

impl RunOutcome {
    /// The state carried by either outcome.
    pub fn state(&self) -> &GraphState {
        match self {
            RunOutcome::Complete(state) => state,
            RunOutcome::Interrupted { state, .. } => state,
        }
    }
}

/// Immutable executable graph.
///
/// Freely shareable; each `invoke` owns its running state and interrupt
/// slot, so one compiled graph serves concurrent invocations.
#[derive(Clone)]
pub struct CompiledGraph {
    pub(crate) nodes: HashMap<String, Arc<dyn Node>>,
    /// Fixed outgoing edges per source, in insertion order.
    pub(crate) edges: HashMap<String, Vec<String>>,
    pub(crate) conditional_edges: HashMap<String, ConditionalEdge>,
    pub(crate) initial_state: GraphState,
    pub(crate) reducers: ReducerMap,
    pub(crate) checkpointer: Option<Arc<dyn CheckpointStore>>,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("has_checkpointer", &self.checkpointer.is_some())
            .finish()
    }
}

impl CompiledGraph {
    /// Runs the graph to a terminal outcome.
    ///
    /// With an update input: the base state is the schema's initial state,
    /// or — when a store and `thread_id` are configured — the latest
    /// checkpoint without pending interrupts; the input merges into it
    /// through the reducers and execution starts at step 0.
    ///
    /// With a resume input: the latest checkpoint must carry a pending
    /// interrupt; exactly the interrupting node is re-run with the resume
    /// value, then execution continues normally.
    pub async fn invoke(
        &self,
        input: impl Into<GraphInput>,
        options: InvokeOptions,
    ) -> Result<RunOutcome, GraphError> {
        let input = input.into();
        let engine = Engine::new(
            self,
            options.recursion_limit,
            self.node_context(&options),
            None,
        );
        let result = self.launch(&engine, input, &options).await;
        if let Err(error) = &result {
            log_graph_error(error);
        }
        result
    }

    /// Exposes one execution as a lazy, single-consumer event sequence.
    ///
    /// The engine runs on a background task; dropping the stream stops
    /// emission but the execution completes in the background. The stream is
    /// finite and ends with a `done` event (or an idle timeout).
    pub fn stream(&self, input: impl Into<GraphInput>, options: InvokeOptions) -> EventStream {
        let (tx, rx) = mpsc::channel(128);
        let graph = self.clone();
        let input = input.into();
        tokio::spawn(async move {
            let engine = Engine::new(
                &graph,
                options.recursion_limit,
                graph.node_context(&options),
                Some(tx.clone()),
            );
            let outcome = match graph.launch(&engine, input, &options).await {
                Ok(RunOutcome::Complete(state)) => StreamOutcome::Complete { state },
                Ok(RunOutcome::Interrupted { value, state }) => {
                    StreamOutcome::Interrupted { value, state }
                }
                Err(error) => {
                    log_graph_error(&error);
                    StreamOutcome::Failed {
                        reason: error.to_string(),
                    }
                }
            };
            let _ = tx.send(ExecutionEvent::Done(outcome)).await;
        });
        EventStream::new(rx)
    }

    /// Returns the checkpoint store the graph was compiled with, if any.
    pub fn checkpointer(&self) -> Option<&Arc<dyn CheckpointStore>> {
        self.checkpointer.as_ref()
    }

    fn node_context(&self, options: &InvokeOptions) -> NodeContext {
        let ctx = NodeContext::new(options.config.clone());
        match &options.context {
            Some(context) => ctx.with_context(context.clone()),
            None => ctx,
        }
    }

    async fn launch(
        &self,
        engine: &Engine<'_>,
        input: GraphInput,
        options: &InvokeOptions,
    ) -> Result<RunOutcome, GraphError> {
        match input {
            GraphInput::Resume(value) => {
                let store = self
                    .checkpointer
                    .as_ref()
                    .ok_or(GraphError::ResumeUnavailable)?;
                if options.config.thread_id.is_none() {
                    return Err(GraphError::ResumeUnavailable);
                }
                let checkpoint = store
                    .load(&options.config)
                    .await?
                    .ok_or(GraphError::NoPendingInterrupt)?;
                if !checkpoint.has_pending_interrupts() {
                    return Err(GraphError::NoPendingInterrupt);
                }
                engine.run_resume(checkpoint, value).await
            }
            GraphInput::Update(update) => {
                let mut state = self.base_state(options).await?;
                apply_update(&mut state, &update, &self.reducers);
                engine.run_from_start(state).await
            }
        }
    }

    /// Base state for a fresh run: the latest checkpoint without pending
    /// interrupts when a store and thread id are configured, else the
    /// schema's initial state.
    async fn base_state(&self, options: &InvokeOptions) -> Result<GraphState, GraphError> {
        if let (Some(store), Some(_)) = (&self.checkpointer, &options.config.thread_id) {
            if let Some(checkpoint) = store.load(&options.config).await? {
                if !checkpoint.has_pending_interrupts() {
                    return Ok(checkpoint.state);
                }
            }
        }
        Ok(self.initial_state.clone())
    }
}
