//! Per-key reducers: merge functions applied when folding updates into state.
//!
//! A reducer is a two-argument merge `(old, new) -> merged` registered for a
//! state key via [`StateSchema::reduced`](crate::state::StateSchema::reduced).
//! Keys without a reducer use last-write-wins. Reducers are assumed pure;
//! keys written by multiple concurrent nodes in one super-step need a
//! commutative reducer or the result on that key is scheduling-dependent.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

/// Two-argument merge function for one state key.
pub type Reducer = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;

/// Reducer table: key -> merge function. Keys outside the table replace.
pub type ReducerMap = HashMap<String, Reducer>;

/// Array concatenation. Non-array operands are treated as single elements;
/// a `null` accumulator is treated as empty.
pub fn append() -> Reducer {
    Arc::new(|old, new| {
        let mut items = match old {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        match new {
            Value::Array(new_items) => items.extend(new_items),
            other => items.push(other),
        }
        Value::Array(items)
    })
}

/// Numeric addition. Integer when both operands are integers, float when
/// either is; non-numeric operands fall back to the new value.
pub fn sum() -> Reducer {
    Arc::new(|old, new| match (old.as_i64(), new.as_i64()) {
        (Some(a), Some(b)) => json!(a + b),
        _ => match (old.as_f64(), new.as_f64()) {
            (Some(a), Some(b)) => json!(a + b),
            _ => new,
        },
    })
}

/// Keep the newest write. Registering this is equivalent to no reducer; it
/// exists so a schema can state the choice explicitly.
pub fn last_write() -> Reducer {
    Arc::new(|_, new| new)
}
