//! In-memory checkpoint store (MemorySaver).
//!
//! Not persistent; for dev and tests. Keyed by thread id; each thread holds
//! its checkpoints in arrival order, with `load`/`list` ordered by
//! `created_at`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::memory::checkpoint::Checkpoint;
use crate::memory::config::RunnableConfig;
use crate::memory::store::{CheckpointError, CheckpointStore, DEFAULT_LIST_LIMIT};

/// In-memory checkpoint store.
///
/// Used as `Arc<dyn CheckpointStore>` in `compile_with_checkpointer`. Safe
/// for concurrent saves on distinct threads.
pub struct MemorySaver {
    inner: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl MemorySaver {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn thread_id(config: &RunnableConfig) -> Result<&str, CheckpointError> {
        config
            .thread_id
            .as_deref()
            .ok_or(CheckpointError::ThreadIdRequired)
    }
}

impl Default for MemorySaver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for MemorySaver {
    async fn save(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointError> {
        let thread_id = Self::thread_id(config)?;
        let mut guard = self.inner.write().await;
        guard
            .entry(thread_id.to_string())
            .or_default()
            .push(checkpoint.clone());
        Ok(())
    }

    async fn load(&self, config: &RunnableConfig) -> Result<Option<Checkpoint>, CheckpointError> {
        let thread_id = Self::thread_id(config)?;
        let guard = self.inner.read().await;
        // max_by keeps the last maximum, so arrival order breaks timestamp ties.
        Ok(guard.get(thread_id).and_then(|checkpoints| {
            checkpoints
                .iter()
                .max_by(|a, b| a.created_at.cmp(&b.created_at))
                .cloned()
        }))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<Checkpoint>, CheckpointError> {
        let thread_id = Self::thread_id(config)?;
        let guard = self.inner.read().await;
        // Arrival order breaks timestamp ties, matching load().
        let mut indexed: Vec<(usize, Checkpoint)> = guard
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .collect();
        indexed.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at).then(b.0.cmp(&a.0)));
        let mut items: Vec<Checkpoint> = indexed.into_iter().map(|(_, item)| item).collect();
        items.truncate(limit.unwrap_or(DEFAULT_LIST_LIMIT));
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::state::GraphState;

    fn state(value: i64) -> GraphState {
        [("value".to_string(), json!(value))].into_iter().collect()
    }

    fn config(thread_id: &str) -> RunnableConfig {
        RunnableConfig::new().with_thread_id(thread_id)
    }

    /// **Scenario**: load without a thread_id fails with ThreadIdRequired.
    #[tokio::test]
    async fn load_requires_thread_id() {
        let saver = MemorySaver::new();
        let result = saver.load(&RunnableConfig::default()).await;
        assert!(matches!(result, Err(CheckpointError::ThreadIdRequired)));
    }

    /// **Scenario**: load returns the latest checkpoint for the thread.
    #[tokio::test]
    async fn load_returns_latest() {
        let saver = MemorySaver::new();
        let config = config("t1");
        for step in 0..3 {
            let checkpoint = Checkpoint::new("t1", state(step as i64), vec![], step);
            saver.save(&config, &checkpoint).await.unwrap();
        }
        let latest = saver.load(&config).await.unwrap().expect("checkpoint");
        assert_eq!(latest.step, 2);
        assert_eq!(latest.state.get("value"), Some(&json!(2)));
    }

    /// **Scenario**: list returns most recent first, bounded by limit.
    #[tokio::test]
    async fn list_most_recent_first_with_limit() {
        let saver = MemorySaver::new();
        let config = config("t1");
        for step in 0..5 {
            let checkpoint = Checkpoint::new("t1", state(step as i64), vec![], step);
            saver.save(&config, &checkpoint).await.unwrap();
        }
        let items = saver.list(&config, Some(2)).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].step, 4);
        assert_eq!(items[1].step, 3);

        let all = saver.list(&config, None).await.unwrap();
        assert_eq!(all.len(), 5);
    }

    /// **Scenario**: threads are isolated; loading an unknown thread yields None.
    #[tokio::test]
    async fn threads_are_isolated() {
        let saver = MemorySaver::new();
        let checkpoint = Checkpoint::new("t1", state(1), vec![], 0);
        saver.save(&config("t1"), &checkpoint).await.unwrap();
        assert!(saver.load(&config("t2")).await.unwrap().is_none());
        assert!(saver.load(&config("t1")).await.unwrap().is_some());
    }

    /// **Scenario**: a saved checkpoint loads back equal in every field.
    #[tokio::test]
    async fn save_load_roundtrip_equality() {
        let saver = MemorySaver::new();
        let config = config("t1");
        let mut checkpoint = Checkpoint::new("t1", state(9), vec!["next".into()], 4);
        checkpoint
            .metadata
            .insert("source".into(), json!("loop"));
        saver.save(&config, &checkpoint).await.unwrap();
        let restored = saver.load(&config).await.unwrap().expect("checkpoint");
        assert_eq!(checkpoint, restored);
    }
}
