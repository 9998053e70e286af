//! Checkpoint persistence: record, store contract, in-memory saver, config.
//!
//! The engine persists a checkpoint after every super-step (and on interrupt)
//! when compiled with a store and invoked with a `thread_id`. Resuming an
//! interrupted execution loads the latest checkpoint with a pending
//! interrupt and re-runs exactly the interrupting node.

mod checkpoint;
mod config;
mod memory_saver;
mod store;

pub use checkpoint::{new_checkpoint_id, Checkpoint, PendingInterrupt};
pub use config::RunnableConfig;
pub use memory_saver::MemorySaver;
pub use store::{CheckpointError, CheckpointStore, DEFAULT_LIST_LIMIT};
