//! Checkpoint store contract.
//!
//! Durable save/load/list of checkpoints keyed by thread id. Backends plug in
//! behind this trait; the engine only ever talks to the contract. Injected at
//! compile via `StateGraph::compile_with_checkpointer` and used when
//! `config.thread_id` is set.

use async_trait::async_trait;

use crate::memory::checkpoint::Checkpoint;
use crate::memory::config::RunnableConfig;

/// Default bound for `list` when no limit is supplied.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Error type for checkpoint store operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("thread_id required")]
    ThreadIdRequired,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
}

/// Durable store of checkpoints keyed by thread id.
///
/// Implementations must tolerate concurrent `save` calls on distinct
/// threads; same-thread ordering is the caller's responsibility (the engine
/// serializes saves within a single invocation).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persists a checkpoint for the thread in `config`.
    async fn save(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint,
    ) -> Result<(), CheckpointError>;

    /// Loads the latest checkpoint (by `created_at` descending) for the
    /// thread in `config`, or `None` when the thread has no checkpoints.
    async fn load(&self, config: &RunnableConfig) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Lists checkpoints for the thread, most recent first, bounded by
    /// `limit` (default [`DEFAULT_LIST_LIMIT`]).
    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<Checkpoint>, CheckpointError>;
}
