//! Phase output - what a phase handler (or an agent contribution) returns.

use super::merge::merge_value;
use crate::cycle::{CycleTask, MetricKind, PhaseMetrics};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Output of one phase execution or one contribution within a phase.
///
/// `fields` are merged into the cycle context; `micro_tasks` are requests for
/// nested cycles and `metrics` feed the phase quality gate. Neither enters
/// the context directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseOutput {
    /// Who produced the output (e.g. `"expand"`, `"agent:alice"`).
    pub source: String,
    pub fields: BTreeMap<String, Value>,
    pub micro_tasks: Vec<CycleTask>,
    #[serde(skip_serializing_if = "PhaseMetrics::is_empty")]
    pub metrics: PhaseMetrics,
}

impl PhaseOutput {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_micro_task(mut self, task: CycleTask) -> Self {
        self.micro_tasks.push(task);
        self
    }

    pub fn with_metric(mut self, metric: MetricKind, value: f64) -> Self {
        self.metrics.insert(metric, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.micro_tasks.is_empty()
    }

    /// Fold two outputs into one using the context conflict policy.
    ///
    /// Merging `combine(a, b)` into a context yields the same entries as merging
    /// `a` then `b`, provided each key keeps a consistent kind (list or scalar).
    pub fn combine(first: &PhaseOutput, second: &PhaseOutput) -> PhaseOutput {
        let mut fields = first.fields.clone();
        for (key, incoming) in &second.fields {
            let merged = merge_value(fields.get(key), incoming);
            fields.insert(key.clone(), merged);
        }

        let mut micro_tasks = first.micro_tasks.clone();
        for task in &second.micro_tasks {
            if !micro_tasks.contains(task) {
                micro_tasks.push(task.clone());
            }
        }

        let mut metrics = first.metrics.clone();
        metrics.extend(second.metrics.iter().map(|(k, v)| (*k, *v)));

        let source = if first.source == second.source {
            first.source.clone()
        } else {
            format!("{}+{}", first.source, second.source)
        };

        PhaseOutput {
            source,
            fields,
            micro_tasks,
            metrics,
        }
    }
}
