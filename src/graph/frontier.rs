//! Next-frontier resolution.
//!
//! Given the just-executed set, the post-step state, and the accumulated
//! command gotos, computes the active set for the next super-step. Command
//! gotos precede edge-derived entries; for each executed node, fixed edges
//! precede its conditional targets; duplicates collapse to their first
//! occurrence. Every resolved name is checked against the compiled node set,
//! so names restored from storage or produced by routers never create nodes
//! dynamically.

use std::collections::HashSet;

use crate::error::GraphError;
use crate::graph::compiled::CompiledGraph;
use crate::graph::conditional::{Dispatch, Route};
use crate::graph::state_graph::END;
use crate::state::GraphState;

/// Outcome of resolving one routing round.
pub(crate) struct ResolvedFrontier {
    /// De-duplicated active set for the next super-step (may contain `END`).
    pub nodes: Vec<String>,
    /// Dynamic fan-out requests to execute immediately and discard.
    pub dispatches: Vec<Dispatch>,
}

/// Computes the next frontier for `executed` under `state` and `gotos`.
pub(crate) fn resolve_frontier(
    graph: &CompiledGraph,
    executed: &[String],
    state: &GraphState,
    gotos: &[String],
) -> Result<ResolvedFrontier, GraphError> {
    let mut entries: Vec<String> = gotos.to_vec();
    let mut dispatches: Vec<Dispatch> = Vec::new();

    for node in executed {
        if let Some(targets) = graph.edges.get(node) {
            entries.extend(targets.iter().cloned());
        }
        if let Some(conditional) = graph.conditional_edges.get(node) {
            match conditional.route(state) {
                Route::Fanout(requested) => dispatches.extend(requested),
                Route::To(key) => entries.push(conditional.resolve_name(&key)?),
                Route::Many(keys) => {
                    for key in keys {
                        entries.push(conditional.resolve_name(&key)?);
                    }
                }
            }
        }
    }

    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    for entry in entries {
        if seen.insert(entry.clone()) {
            nodes.push(entry);
        }
    }

    for name in &nodes {
        if name != END && !graph.nodes.contains_key(name) {
            return Err(GraphError::UnknownNode(name.clone()));
        }
    }
    for dispatch in &dispatches {
        if !graph.nodes.contains_key(&dispatch.node) {
            return Err(GraphError::UnknownNode(dispatch.node.clone()));
        }
    }

    Ok(ResolvedFrontier { nodes, dispatches })
}
