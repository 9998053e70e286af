//! Execution error types.
//!
//! `NodeError` is what node bodies return; `GraphError` is what an invocation
//! returns. Interrupts travel through `NodeError` so the engine frame that
//! invoked the node can catch them, but they are *not* invocation errors:
//! `CompiledGraph::invoke` reports them as `RunOutcome::Interrupted`.

use thiserror::Error;

use crate::graph::Interrupt;
use crate::memory::CheckpointError;

/// Error returned by a node body.
///
/// Returned by `Node::run`. `Interrupted` is the cooperative suspension
/// signal raised by [`interrupt`](crate::graph::interrupt); node bodies must
/// propagate it with `?` rather than catching it themselves.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Execution failed with a message (e.g. an I/O call inside the node).
    #[error("execution failed: {0}")]
    Failed(String),

    /// The node requested a cooperative pause carrying a payload.
    ///
    /// Caught only by the engine frame that invoked the node; it unwinds the
    /// node body and surfaces as `RunOutcome::Interrupted` to the caller.
    #[error("interrupted: {0:?}")]
    Interrupted(Interrupt),
}

impl NodeError {
    /// Shorthand for `NodeError::Failed`.
    pub fn failed(message: impl Into<String>) -> Self {
        NodeError::Failed(message.into())
    }
}

impl From<Interrupt> for NodeError {
    fn from(interrupt: Interrupt) -> Self {
        NodeError::Interrupted(interrupt)
    }
}

/// Error terminating a graph invocation.
///
/// Every terminal outcome of `invoke` is a tagged value: `Ok(RunOutcome)` for
/// completion and interrupts, `Err(GraphError)` for everything below. The
/// engine does not retry node bodies or store operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The super-step bound was reached before the graph terminated.
    ///
    /// Recoverable: re-invoke with a higher limit; with a checkpoint store
    /// configured the last persisted step is the restart point.
    #[error("recursion limit {limit} reached at step {step} (frontier: {frontier:?})")]
    RecursionLimit {
        limit: usize,
        step: usize,
        frontier: Vec<String>,
    },

    /// A conditional router returned a key absent from its mapping.
    #[error("unknown branch: {value}")]
    UnknownBranch { value: String },

    /// A frontier target (edge, goto, dispatch, or restored name) is not a
    /// registered node.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// A node task failed (error return or panic). Fatal for the invocation.
    #[error("node {node} failed: {message}")]
    NodeFailed { node: String, message: String },

    /// A checkpoint store operation failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// A resume was requested but the latest checkpoint for the thread has no
    /// pending interrupt (or the thread has no checkpoint at all).
    #[error("no pending interrupt for thread")]
    NoPendingInterrupt,

    /// A resume was requested without a checkpoint store or thread_id.
    #[error("resume requires a checkpoint store and a thread_id")]
    ResumeUnavailable,
}
