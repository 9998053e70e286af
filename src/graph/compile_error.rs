//! Graph compilation error.
//!
//! Returned by `StateGraph::compile` when the draft graph cannot be frozen
//! into an executable one. All compile-time validation failures are fatal.

use thiserror::Error;

/// Error when compiling a state graph.
///
/// Validation ensures every fixed-edge endpoint is a registered node or a
/// distinguished name, that `__start__` has at least one outgoing edge, and
/// that no node shadows a distinguished name. Conditional-edge targets are
/// deliberately not validated here; a bad branch surfaces at runtime.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// An edge endpoint (or conditional source) was not registered via
    /// `add_node` and is not a distinguished name.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// `__start__` has no outgoing fixed or conditional edge.
    #[error("graph must have at least one edge from __start__")]
    MissingStart,

    /// A node was registered under a reserved name (`__start__` / `__end__`).
    #[error("reserved node name: {0}")]
    ReservedNodeName(String),
}
