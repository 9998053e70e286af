//! Cooperative interrupt channel for human-in-the-loop pauses.
//!
//! A node body calls [`interrupt`] to either suspend execution carrying a
//! payload, or — when the invocation is a resume — observe the resume value
//! at the very same call site:
//!
//! ```rust,ignore
//! async fn run(&self, state: GraphState, _ctx: NodeContext) -> Result<NodeOutput, NodeError> {
//!     let approved = interrupt(json!("Approve value 42?"))?;
//!     Ok(NodeOutput::update(StateUpdate::new().set("approved", approved)))
//! }
//! ```
//!
//! The suspension travels as `NodeError::Interrupted` and is caught *only*
//! by the engine frame that invoked the node; a node must not catch it
//! itself. The resume value lives in a per-invocation task-local slot that
//! the engine sets around exactly the resumed node call and clears when the
//! call returns.

use std::cell::RefCell;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NodeError;

/// Payload of a cooperative pause raised during graph execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interrupt {
    /// The value surfaced to the caller (any JSON-serializable data).
    pub value: Value,
}

impl Interrupt {
    /// Creates an interrupt carrying `value`.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

tokio::task_local! {
    /// Per-invocation resume slot. Holds the resume value while the engine
    /// re-runs the interrupting node; empty during normal execution.
    static RESUME_SLOT: RefCell<Option<Value>>;
}

/// Suspends the current node with `payload`, or returns the resume value.
///
/// When the ambient slot holds a resume value the value is returned as-is
/// (it remains in the slot until the engine clears it, so repeated calls in
/// the same resumed body see the same value). Otherwise the call signals a
/// cooperative suspension; propagate it with `?`.
pub fn interrupt(payload: impl Into<Value>) -> Result<Value, NodeError> {
    let resume = RESUME_SLOT
        .try_with(|slot| slot.borrow().clone())
        .unwrap_or(None);
    match resume {
        Some(value) => Ok(value),
        None => Err(NodeError::Interrupted(Interrupt::new(payload.into()))),
    }
}

/// Runs `fut` with the resume slot set to `resume`. The slot is scoped to
/// the future: it brackets exactly one node call and vanishes afterwards.
pub(crate) async fn with_resume_slot<F: Future>(resume: Option<Value>, fut: F) -> F::Output {
    RESUME_SLOT.scope(RefCell::new(resume), fut).await
}
