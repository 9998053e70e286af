//! Invocation config: thread identity plus backend-specific extras.
//!
//! Passed to `CompiledGraph::invoke(input, options)` and to every
//! `CheckpointStore` operation. When a checkpoint store is used, `thread_id`
//! is required; `extras` is an open bag for backend keys (TTL seconds,
//! schema prefix, repository handle).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Config for a single invocation. Identifies the thread that groups
/// successive checkpoints so an interrupted execution can be continued later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnableConfig {
    /// Unique id for this conversation/thread. Required when using a
    /// checkpoint store.
    pub thread_id: Option<String>,
    /// Backend-specific optional keys (e.g. `ttl_seconds`, `schema_prefix`).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extras: serde_json::Map<String, Value>,
}

impl RunnableConfig {
    /// Creates an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the thread id, returning `self` for chaining.
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Sets a backend-specific extra, returning `self` for chaining.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Returns a backend-specific extra, if present.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: default config has no thread_id and no extras.
    #[test]
    fn default_is_empty() {
        let config = RunnableConfig::default();
        assert!(config.thread_id.is_none());
        assert!(config.extras.is_empty());
    }

    /// **Scenario**: builder methods set thread_id and extras; clone matches.
    #[test]
    fn builder_and_clone() {
        let config = RunnableConfig::new()
            .with_thread_id("t1")
            .with_extra("ttl_seconds", json!(3600));
        assert_eq!(config.thread_id.as_deref(), Some("t1"));
        assert_eq!(config.extra("ttl_seconds"), Some(&json!(3600)));
        let copy = config.clone();
        assert_eq!(config, copy);
    }
}
