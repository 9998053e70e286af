//! Conditional edges: route to the next frontier based on state.
//!
//! A source node may carry a routing function `(state) -> Route`; after the
//! node runs, the router is called with the post-step state. Its result is
//! either one name, several names, or a dynamic fan-out of [`Dispatch`]es.
//! Names may pass through an optional mapping; a key absent from the mapping
//! is a fatal routing error.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GraphError;
use crate::state::GraphState;

/// Router function: post-step state in, routing decision out.
pub type RouterFn = Arc<dyn Fn(&GraphState) -> Route + Send + Sync>;

/// A dynamic fan-out request: run `node` once with `state` as its complete
/// input, isolated from the main line.
///
/// Dispatch results are discarded — they never merge into the global state
/// and contribute no frontier entries. Their purpose is side effects into
/// external sinks (or the checkpoint store) from the node body.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Node to execute.
    pub node: String,
    /// Complete state payload handed to the node (not merged back).
    pub state: GraphState,
}

impl Dispatch {
    /// Creates a dispatch of `node` with `state` as its full input.
    pub fn new(node: impl Into<String>, state: GraphState) -> Self {
        Self {
            node: node.into(),
            state,
        }
    }
}

/// Routing decision returned by a conditional router.
#[derive(Debug, Clone)]
pub enum Route {
    /// One target name (looked up in the mapping when one is present).
    To(String),
    /// Several target names; all are added to the frontier.
    Many(Vec<String>),
    /// Dynamic fan-out: each dispatch runs immediately and is discarded;
    /// the conditional contributes no frontier entries.
    Fanout(Vec<Dispatch>),
}

impl Route {
    /// Route to a single named node (or `END`).
    pub fn to(name: impl Into<String>) -> Self {
        Route::To(name.into())
    }

    /// Route to several named nodes.
    pub fn many<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Route::Many(names.into_iter().map(Into::into).collect())
    }

    /// Dynamic fan-out of isolated node executions.
    pub fn fanout<I>(dispatches: I) -> Self
    where
        I: IntoIterator<Item = Dispatch>,
    {
        Route::Fanout(dispatches.into_iter().collect())
    }
}

/// Conditional edge definition: routing function plus optional mapping.
#[derive(Clone)]
pub struct ConditionalEdge {
    router: RouterFn,
    mapping: Option<HashMap<String, String>>,
}

impl ConditionalEdge {
    /// Builds a conditional edge. With a mapping, router results are keys
    /// into it; without one, results are node names directly.
    pub fn new(router: RouterFn, mapping: Option<HashMap<String, String>>) -> Self {
        Self { router, mapping }
    }

    /// Invokes the router on the post-step state.
    pub(crate) fn route(&self, state: &GraphState) -> Route {
        (self.router)(state)
    }

    /// Resolves one router result to a node name. A mapping miss is fatal.
    pub(crate) fn resolve_name(&self, key: &str) -> Result<String, GraphError> {
        match &self.mapping {
            Some(mapping) => mapping
                .get(key)
                .cloned()
                .ok_or_else(|| GraphError::UnknownBranch {
                    value: key.to_string(),
                }),
            None => Ok(key.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state_with_status(status: &str) -> GraphState {
        [("status".to_string(), json!(status))].into_iter().collect()
    }

    fn status_router() -> RouterFn {
        Arc::new(|state: &GraphState| {
            let status = state
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Route::to(status.to_string())
        })
    }

    /// **Scenario**: without a mapping, the router result is the node name.
    #[test]
    fn resolve_without_mapping_uses_key() {
        let edge = ConditionalEdge::new(status_router(), None);
        match edge.route(&state_with_status("pass")) {
            Route::To(key) => assert_eq!(edge.resolve_name(&key).unwrap(), "pass"),
            other => panic!("expected Route::To, got {:?}", other),
        }
    }

    /// **Scenario**: with a mapping, the key is looked up; a hit resolves.
    #[test]
    fn resolve_with_mapping_hit() {
        let mapping: HashMap<String, String> =
            [("ok".to_string(), "pass".to_string())].into_iter().collect();
        let edge = ConditionalEdge::new(status_router(), Some(mapping));
        assert_eq!(edge.resolve_name("ok").unwrap(), "pass");
    }

    /// **Scenario**: a mapping miss is a fatal routing error carrying the key.
    #[test]
    fn resolve_with_mapping_miss_is_fatal() {
        let mapping: HashMap<String, String> =
            [("ok".to_string(), "pass".to_string())].into_iter().collect();
        let edge = ConditionalEdge::new(status_router(), Some(mapping));
        match edge.resolve_name("nope") {
            Err(GraphError::UnknownBranch { value }) => assert_eq!(value, "nope"),
            other => panic!("expected UnknownBranch, got {:?}", other),
        }
    }
}
