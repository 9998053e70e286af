//! # Heddle
//!
//! Stateful, multi-step workflows as directed graphs, executed as a
//! bulk-synchronous-parallel computation over a structured state value.
//!
//! Define a **state schema** (keys with defaults and optional per-key
//! reducers), a set of **named nodes** (async computations from state to a
//! partial update), and **edges** (fixed, conditional, or dynamically
//! emitted). Execution advances the state through discrete **super-steps**
//! until the graph reaches [`END`], a node pauses cooperatively via
//! [`interrupt`], or the recursion bound is exceeded.
//!
//! ## Design
//!
//! - **Schema-driven state**: one ordered JSON map flows through all nodes;
//!   nodes return partial [`StateUpdate`]s merged through per-key reducers.
//! - **Super-steps**: the whole frontier runs concurrently, then all updates
//!   fold before routing picks the next frontier. Between steps there is a
//!   strict happens-before; within a step, register a commutative reducer
//!   for any key written by multiple nodes.
//! - **Interrupt/resume**: a node calls [`interrupt`] to pause with a
//!   payload; with a checkpoint store and a `thread_id`, a later invocation
//!   with [`GraphInput::Resume`] re-runs exactly that node and the same call
//!   returns the resume value.
//! - **Checkpointing**: every super-step persists a [`Checkpoint`] through
//!   the [`CheckpointStore`] contract; [`MemorySaver`] is the in-memory
//!   implementation for dev and tests.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use heddle::{
//!     InvokeOptions, NodeOutput, RunOutcome, StateGraph, StateSchema, StateUpdate, END, START,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut graph = StateGraph::new(StateSchema::new().field("value", json!(0)));
//!     graph.add_node_fn("double", |state: heddle::GraphState| async move {
//!         let value = state.get("value").and_then(|v| v.as_i64()).unwrap_or(0);
//!         Ok(NodeOutput::update(
//!             StateUpdate::new().set("value", json!(value * 2)),
//!         ))
//!     });
//!     graph.add_edge(START, "double");
//!     graph.add_edge("double", END);
//!     let compiled = graph.compile()?;
//!
//!     let outcome = compiled
//!         .invoke(
//!             StateUpdate::new().set("value", json!(5)),
//!             InvokeOptions::default(),
//!         )
//!         .await?;
//!     match outcome {
//!         RunOutcome::Complete(state) => println!("{:?}", state.get("value")),
//!         RunOutcome::Interrupted { value, .. } => println!("paused on {value}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledGraph`], [`Node`], routing and the
//!   engine.
//! - [`state`]: [`GraphState`], [`StateSchema`], [`StateUpdate`],
//!   [`reducers`].
//! - [`memory`]: [`Checkpoint`], [`CheckpointStore`], [`MemorySaver`],
//!   [`RunnableConfig`].
//! - [`stream`]: [`ExecutionEvent`], [`EventStream`] for streamed runs.

pub mod error;
pub mod graph;
pub mod memory;
pub mod state;
pub mod stream;

pub use error::{GraphError, NodeError};
pub use graph::{
    generate_dot, generate_text, interrupt, Command, CompilationError, CompiledGraph,
    ConditionalEdge, Dispatch, FnNode, GraphInput, Interrupt, InvokeOptions, Node, NodeContext,
    NodeOutput, Route, RouterFn, RunOutcome, StateGraph, SubgraphNode, DEFAULT_RECURSION_LIMIT,
    END, START,
};
pub use memory::{
    new_checkpoint_id, Checkpoint, CheckpointError, CheckpointStore, MemorySaver,
    PendingInterrupt, RunnableConfig, DEFAULT_LIST_LIMIT,
};
pub use state::reducers;
pub use state::{
    apply_update, GraphState, Reducer, ReducerMap, StateSchema, StateUpdate, REMAINING_STEPS,
};
pub use stream::{EventStream, ExecutionEvent, StreamOutcome, DEFAULT_IDLE_TIMEOUT};
