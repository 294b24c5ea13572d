//! Context entity - the shared, merge-only state of a cycle.

use super::merge::merge_value;
use super::phase_output::PhaseOutput;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One applied merge, kept in the context's history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub source: String,
    pub fields: BTreeMap<String, Value>,
}

impl MergeRecord {
    fn from_output(output: &PhaseOutput) -> Self {
        Self {
            source: output.source.clone(),
            fields: output.fields.clone(),
        }
    }

    fn matches(&self, output: &PhaseOutput) -> bool {
        self.source == output.source && self.fields == output.fields
    }
}

/// Key-ordered mapping of values plus the log of merges that produced it.
///
/// Entries are kept in a `BTreeMap` so two contexts holding the same data
/// compare equal regardless of the order in which keys first appeared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    entries: BTreeMap<String, Value>,
    history: Vec<MergeRecord>,
}

/// Frozen copy of a context used for rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot(Context);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure merge: returns the merged context, leaving `self` untouched.
    pub fn merge(&self, output: &PhaseOutput) -> Context {
        let mut next = self.clone();
        next.merge_in_place(output);
        next
    }

    /// Merge `output` into this context.
    ///
    /// Returns `false` when the output was already merged (no-op).
    pub fn merge_in_place(&mut self, output: &PhaseOutput) -> bool {
        if self.history.iter().any(|record| record.matches(output)) {
            return false;
        }
        for (key, incoming) in &output.fields {
            let merged = merge_value(self.entries.get(key), incoming);
            self.entries.insert(key.clone(), merged);
        }
        self.history.push(MergeRecord::from_output(output));
        true
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(Value::as_f64)
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    pub fn history(&self) -> &[MergeRecord] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot(self.clone())
    }

    pub fn restore(&mut self, snapshot: ContextSnapshot) {
        *self = snapshot.0;
    }

    /// Rough serialized size of the entries, used for memory accounting.
    pub fn approx_bytes(&self) -> u64 {
        serde_json::to_vec(&self.entries)
            .map(|bytes| bytes.len() as u64)
            .unwrap_or(0)
    }

    /// Entries as a JSON object (for reports and persistence).
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.clone().into_iter().collect())
    }
}
