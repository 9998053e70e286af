//! Structured logging for graph execution.
//!
//! Interrupts are a first-class outcome, not failures; they log at info.

use crate::error::GraphError;

/// Logs the start of a super-step with its active set.
pub(crate) fn log_step_start(step: usize, nodes: &[String]) {
    tracing::debug!(step, ?nodes, "super-step start");
}

/// Logs the start of one node execution.
pub(crate) fn log_node_start(node: &str) {
    tracing::debug!(node, "node start");
}

/// Logs completion of one node execution.
pub(crate) fn log_node_complete(node: &str) {
    tracing::debug!(node, "node complete");
}

/// Logs the end of a super-step.
pub(crate) fn log_step_end(step: usize) {
    tracing::debug!(step, "super-step end");
}

/// Logs successful termination.
pub(crate) fn log_graph_complete(steps: usize) {
    tracing::info!(steps, "graph execution complete");
}

/// Logs a cooperative pause.
pub(crate) fn log_interrupt(node: &str) {
    tracing::info!(node, "graph interrupted");
}

/// Logs a fatal invocation error.
pub(crate) fn log_graph_error(error: &GraphError) {
    tracing::error!(%error, "graph execution error");
}
