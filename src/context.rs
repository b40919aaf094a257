//! Run context threaded between steps
//!
//! A Context is the key/value payload a step executes against. Snapshots are
//! immutable: every step consumes one snapshot and the orchestrator derives
//! the next, so concurrent branches never alias shared state.

use serde_json::{Map, Value};

/// Engine-managed key: output of the most recently completed step
pub const PREVIOUS_OUTPUT: &str = "previous_output";

/// Engine-managed key: `branch_<i>` → `branch_<j>` → output text
pub const BRANCH_OUTPUTS: &str = "branch_outputs";

/// Key/value payload passed to and from steps during one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from caller-supplied initial fields
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Build a context holding a single `user_input` field
    pub fn from_input(input: impl Into<String>) -> Self {
        let mut values = Map::new();
        values.insert("user_input".to_string(), Value::String(input.into()));
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String form of a value, for tag substitution and display.
    /// Strings come back verbatim; everything else is rendered as JSON.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Derive a snapshot with one extra (or replaced) field
    pub fn with_value(&self, key: impl Into<String>, value: Value) -> Self {
        let mut values = self.values.clone();
        values.insert(key.into(), value);
        Self { values }
    }

    /// Derive the post-step snapshot: `previous_output` replaced, all other
    /// fields carried forward unchanged
    pub fn with_previous_output(&self, output: impl Into<String>) -> Self {
        self.with_value(PREVIOUS_OUTPUT, Value::String(output.into()))
    }

    pub fn previous_output(&self) -> Option<&str> {
        self.values.get(PREVIOUS_OUTPUT).and_then(Value::as_str)
    }

    /// Record a branch step's collected outputs under
    /// `branch_outputs.branch_<step_index>`
    pub fn with_branch_outputs(&self, step_index: usize, outputs: Map<String, Value>) -> Self {
        let mut all = match self.values.get(BRANCH_OUTPUTS) {
            Some(Value::Object(existing)) => existing.clone(),
            _ => Map::new(),
        };
        all.insert(format!("branch_{step_index}"), Value::Object(outputs));
        self.with_value(BRANCH_OUTPUTS, Value::Object(all))
    }

    /// Collected outputs of the branch step at `step_index`, if it has run
    pub fn branch_outputs(&self, step_index: usize) -> Option<&Map<String, Value>> {
        self.values
            .get(BRANCH_OUTPUTS)?
            .get(format!("branch_{step_index}"))?
            .as_object()
    }

    /// Full payload as a JSON object (what the step executor receives)
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}
