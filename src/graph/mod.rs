//! Graph construction and execution.
//!
//! Build a [`StateGraph`] over a schema, compile it, then `invoke` or
//! `stream` the resulting [`CompiledGraph`]. Execution is a
//! bulk-synchronous-parallel loop over super-steps; see the crate docs for
//! the execution model.

mod compile_error;
mod compiled;
mod conditional;
mod frontier;
mod interrupt;
mod logging;
mod node;
mod runtime;
mod state_graph;
mod visualization;

pub use compile_error::CompilationError;
pub use compiled::{CompiledGraph, GraphInput, InvokeOptions, RunOutcome};
pub use conditional::{ConditionalEdge, Dispatch, Route, RouterFn};
pub use interrupt::{interrupt, Interrupt};
pub use node::{Command, FnNode, Node, NodeContext, NodeOutput, SubgraphNode};
pub use runtime::DEFAULT_RECURSION_LIMIT;
pub use state_graph::{StateGraph, END, START};
pub use visualization::{generate_dot, generate_text};
