//! Checkpoint record and wire format.
//!
//! A checkpoint is a resumable snapshot of one super-step: the post-step
//! state (managed key stripped), the names scheduled for the next step, the
//! step counter, and any pending interrupt. Checkpoints are grouped by
//! `thread_id` and ordered by `created_at`.
//!
//! Wire format (JSON-capable backends): `state` keys are stored as strings
//! and restored to the schema's key set; `next_nodes` and the interrupt
//! `node` are stored as strings and must be resolved only against the
//! compiled graph's node set on restore; `created_at` is RFC3339 with
//! microsecond precision; `checkpoint_id` is URL-safe base64 of 16 random
//! bytes, without padding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::GraphState;

/// A pending cooperative pause recorded with a checkpoint: the interrupt
/// payload and the node to re-run on resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInterrupt {
    /// Payload surfaced to the caller by the interrupting node.
    pub value: Value,
    /// Name of the node that raised the interrupt; re-executed on resume.
    pub node: String,
}

/// One resumable snapshot of graph execution.
///
/// Produced by the engine after each super-step (and on interrupt); owned by
/// the store after `save` returns. `load` returns the latest checkpoint for a
/// thread by `created_at` descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Thread the checkpoint belongs to.
    pub thread_id: String,
    /// Freshly generated, unguessable id (16 random bytes, URL-safe base64).
    pub checkpoint_id: String,
    /// Id of the previous checkpoint in this invocation, if any.
    pub parent_id: Option<String>,
    /// Post-step state with the managed key stripped.
    pub state: GraphState,
    /// Node names scheduled for the next super-step.
    pub next_nodes: Vec<String>,
    /// Super-step counter at the time of the snapshot.
    pub step: usize,
    /// Free-form metadata.
    pub metadata: serde_json::Map<String, Value>,
    /// `None` for normal steps; the pending pause(s) for interrupt snapshots.
    pub pending_interrupts: Option<Vec<PendingInterrupt>>,
    /// RFC3339 timestamp with microsecond precision.
    pub created_at: String,
}

impl Checkpoint {
    /// Creates a checkpoint for `thread_id` with a fresh id and timestamp.
    pub fn new(
        thread_id: impl Into<String>,
        state: GraphState,
        next_nodes: Vec<String>,
        step: usize,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            checkpoint_id: new_checkpoint_id(),
            parent_id: None,
            state,
            next_nodes,
            step,
            metadata: serde_json::Map::new(),
            pending_interrupts: None,
            created_at: now_rfc3339_micros(),
        }
    }

    /// True when the checkpoint records at least one pending interrupt.
    pub fn has_pending_interrupts(&self) -> bool {
        self.pending_interrupts
            .as_ref()
            .map_or(false, |pending| !pending.is_empty())
    }
}

/// Generates a fresh checkpoint id: URL-safe base64 of 16 random bytes,
/// without padding (22 characters).
pub fn new_checkpoint_id() -> String {
    let bytes: [u8; 16] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Current wall-clock time as RFC3339 with microsecond precision.
pub(crate) fn now_rfc3339_micros() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_state() -> GraphState {
        [("value".to_string(), json!(42))].into_iter().collect()
    }

    /// **Scenario**: ids are 22 URL-safe characters and unique across draws.
    #[test]
    fn checkpoint_id_shape_and_uniqueness() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let id = new_checkpoint_id();
            assert_eq!(id.len(), 22, "16 bytes -> 22 unpadded base64 chars");
            assert!(
                id.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
                "id must be URL-safe: {}",
                id
            );
            assert!(seen.insert(id), "duplicate checkpoint id");
        }
    }

    /// **Scenario**: created_at parses as RFC3339 and carries six fractional digits.
    #[test]
    fn created_at_rfc3339_micros() {
        let ts = now_rfc3339_micros();
        let parsed = chrono::DateTime::parse_from_rfc3339(&ts);
        assert!(parsed.is_ok(), "not RFC3339: {}", ts);
        let fraction = ts.split('.').nth(1).expect("fractional part");
        let digits: String = fraction.chars().take_while(|c| c.is_ascii_digit()).collect();
        assert_eq!(digits.len(), 6, "expected microseconds in {}", ts);
    }

    /// **Scenario**: JSON shape matches the wire format field-for-field.
    #[test]
    fn wire_format_shape() {
        let mut checkpoint = Checkpoint::new("t1", sample_state(), vec!["finalize".into()], 3);
        checkpoint.pending_interrupts = Some(vec![PendingInterrupt {
            value: json!("approve?"),
            node: "check".into(),
        }]);
        let wire = serde_json::to_value(&checkpoint).unwrap();

        assert_eq!(wire["thread_id"], json!("t1"));
        assert!(wire["checkpoint_id"].is_string());
        assert_eq!(wire["parent_id"], Value::Null);
        assert_eq!(wire["state"]["value"], json!(42));
        assert_eq!(wire["next_nodes"], json!(["finalize"]));
        assert_eq!(wire["step"], json!(3));
        assert!(wire["metadata"].is_object());
        assert_eq!(wire["pending_interrupts"][0]["node"], json!("check"));
        assert_eq!(wire["pending_interrupts"][0]["value"], json!("approve?"));
        assert!(wire["created_at"].is_string());
    }

    /// **Scenario**: serialize-then-deserialize returns an equal record,
    /// including unknown state keys.
    #[test]
    fn wire_format_roundtrip() {
        let mut state = sample_state();
        state.insert("unknown_extra", json!({"kept": true}));
        let checkpoint = Checkpoint::new("t1", state, vec!["a".into(), "b".into()], 7);
        let text = serde_json::to_string(&checkpoint).unwrap();
        let restored: Checkpoint = serde_json::from_str(&text).unwrap();
        assert_eq!(checkpoint, restored);
        assert_eq!(
            restored.state.get("unknown_extra"),
            Some(&json!({"kept": true}))
        );
    }

    /// **Scenario**: has_pending_interrupts is false for None and empty lists.
    #[test]
    fn pending_interrupts_presence() {
        let mut checkpoint = Checkpoint::new("t1", sample_state(), vec![], 0);
        assert!(!checkpoint.has_pending_interrupts());
        checkpoint.pending_interrupts = Some(vec![]);
        assert!(!checkpoint.has_pending_interrupts());
        checkpoint.pending_interrupts = Some(vec![PendingInterrupt {
            value: json!(1),
            node: "n".into(),
        }]);
        assert!(checkpoint.has_pending_interrupts());
    }
}
