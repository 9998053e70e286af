//! Graph state: schema, ordered state map, partial updates, managed key.
//!
//! A graph's state is a mapping from symbolic keys to JSON values. The schema
//! declares the keys, their defaults, and optional per-key [`Reducer`]s;
//! parsing it yields the initial state and the reducer table. Nodes return
//! [`StateUpdate`]s (ordered partial writes) which the engine folds into the
//! running state with [`apply_update`].
//!
//! The engine additionally injects the managed key [`REMAINING_STEPS`] before
//! each super-step and strips it before any state is observed or persisted.

pub mod reducers;

pub use reducers::{Reducer, ReducerMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Managed key injected by the engine: `recursion_limit - current_step`.
///
/// Visible to node bodies during execution, never present in observed or
/// persisted state.
pub const REMAINING_STEPS: &str = "remaining_steps";

/// The state value a graph executes over: an insertion-ordered key/value map.
///
/// Keys are stringified on the wire and restored to the schema's key set;
/// unknown keys round-trip unchanged. Equality is order-independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphState(IndexMap<String, Value>);

impl GraphState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the state holds no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl FromIterator<(String, Value)> for GraphState {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for GraphState {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A partial state update returned by a node: ordered `(key, value)` writes.
///
/// Iteration order follows the producing node's emission order; duplicate
/// keys are applied in order, so for reducer-free keys the last write wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateUpdate(Vec<(String, Value)>);

impl StateUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a write, returning `self` for chaining.
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.push((key.into(), value));
        self
    }

    /// Appends a write in place.
    pub fn push(&mut self, key: impl Into<String>, value: Value) {
        self.0.push((key.into(), value));
    }

    /// True when the update holds no writes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of writes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates writes in emission order.
    pub fn iter(&self) -> std::slice::Iter<'_, (String, Value)> {
        self.0.iter()
    }
}

impl From<GraphState> for StateUpdate {
    /// A full state as an update: every entry becomes a write, in order.
    /// Used when a subgraph's final state merges into its parent.
    fn from(state: GraphState) -> Self {
        Self(state.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for StateUpdate {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Schema entry: key, default value, optional reducer.
#[derive(Clone)]
struct SchemaEntry {
    key: String,
    default: Value,
    reducer: Option<Reducer>,
}

/// Ordered state schema: keys with defaults and optional per-key reducers.
///
/// A later entry for the same key overwrites an earlier one. Parsing yields
/// `(initial_state, reducer_table)`; both are frozen into the compiled graph.
///
/// # Example
///
/// ```rust
/// use heddle::{reducers, StateSchema};
/// use serde_json::json;
///
/// let schema = StateSchema::new()
///     .field("status", json!(""))
///     .reduced("log", json!([]), reducers::append());
/// ```
#[derive(Clone, Default)]
pub struct StateSchema {
    entries: Vec<SchemaEntry>,
}

impl StateSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declares a last-write-wins key with a default value.
    pub fn field(mut self, key: impl Into<String>, default: Value) -> Self {
        self.entries.push(SchemaEntry {
            key: key.into(),
            default,
            reducer: None,
        });
        self
    }

    /// Declares a key merged through `reducer` when updates are folded.
    pub fn reduced(mut self, key: impl Into<String>, default: Value, reducer: Reducer) -> Self {
        self.entries.push(SchemaEntry {
            key: key.into(),
            default,
            reducer: Some(reducer),
        });
        self
    }

    /// Parses the schema into the initial state and the reducer table,
    /// preserving entry order; later entries for a key overwrite earlier ones.
    pub fn parse(&self) -> (GraphState, ReducerMap) {
        let mut initial = GraphState::new();
        let mut table = ReducerMap::new();
        for entry in &self.entries {
            initial.insert(entry.key.clone(), entry.default.clone());
            match &entry.reducer {
                Some(reducer) => {
                    table.insert(entry.key.clone(), reducer.clone());
                }
                None => {
                    table.remove(&entry.key);
                }
            }
        }
        (initial, table)
    }
}

/// Folds `update` into `state` under `reducers`.
///
/// For each write `(k, v)` in emission order: if a reducer is registered for
/// `k` the stored value becomes `reducer(current, v)` (with `null` standing
/// in for a missing current value); otherwise `v` replaces the current value.
pub fn apply_update(state: &mut GraphState, update: &StateUpdate, reducers: &ReducerMap) {
    for (key, value) in update.iter() {
        match reducers.get(key) {
            Some(reduce) => {
                let current = state.get(key).cloned().unwrap_or(Value::Null);
                state.insert(key.clone(), reduce(current, value.clone()));
            }
            None => {
                state.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Sets the managed `remaining_steps` key to `limit - step`.
pub(crate) fn inject_managed(state: &mut GraphState, step: usize, limit: usize) {
    state.insert(REMAINING_STEPS, json!(limit.saturating_sub(step)));
}

/// Removes the managed `remaining_steps` key.
pub(crate) fn strip_managed(state: &mut GraphState) {
    state.remove(REMAINING_STEPS);
}
