//! Cycle value objects - identifiers, tasks and task metrics.
//!
//! # Identifiers
//! - [`CycleId`] - Unique identifier of a cycle in the registry
//!
//! # Work description
//! - [`CycleTask`] - What a cycle (or micro-cycle) is asked to do
//! - [`TaskMetrics`] - Scores attached to a task, consumed by the termination heuristics
//! - [`HumanOverride`] - Explicit operator directive for recursion

use serde::{Deserialize, Serialize};

/// Unique identifier for a cycle.
///
/// Children reference their parent through this id, never through a pointer,
/// so the cycle registry stays a flat arena.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CycleId(String);

impl CycleId {
    /// Creates a CycleId from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random (v4) id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for CycleId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operator directive that short-circuits the recursion heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HumanOverride {
    /// Never spawn a micro-cycle for this task.
    Terminate,
    /// Spawn regardless of the remaining heuristics (depth limit still applies).
    Continue,
}

/// Scores describing a task, all optional.
///
/// Missing scores make the corresponding heuristic abstain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskMetrics {
    pub human_override: Option<HumanOverride>,
    pub granularity_score: Option<f64>,
    pub cost_score: Option<f64>,
    pub benefit_score: Option<f64>,
    pub quality_score: Option<f64>,
    pub resource_usage: Option<f64>,
    pub complexity_score: Option<f64>,
    pub convergence_score: Option<f64>,
    pub improvement_rate: Option<f64>,
}

impl TaskMetrics {
    pub fn with_override(mut self, directive: HumanOverride) -> Self {
        self.human_override = Some(directive);
        self
    }

    pub fn with_granularity(mut self, score: f64) -> Self {
        self.granularity_score = Some(score);
        self
    }

    pub fn with_cost_benefit(mut self, cost: f64, benefit: f64) -> Self {
        self.cost_score = Some(cost);
        self.benefit_score = Some(benefit);
        self
    }

    pub fn with_quality(mut self, score: f64) -> Self {
        self.quality_score = Some(score);
        self
    }

    pub fn with_resource_usage(mut self, usage: f64) -> Self {
        self.resource_usage = Some(usage);
        self
    }

    pub fn with_complexity(mut self, score: f64) -> Self {
        self.complexity_score = Some(score);
        self
    }

    pub fn with_convergence(mut self, score: f64) -> Self {
        self.convergence_score = Some(score);
        self
    }

    pub fn with_improvement_rate(mut self, rate: f64) -> Self {
        self.improvement_rate = Some(rate);
        self
    }

    /// Cost divided by benefit; infinite when the benefit is not positive.
    pub fn cost_benefit_ratio(&self) -> Option<f64> {
        let cost = self.cost_score?;
        let benefit = self.benefit_score?;
        if benefit > 0.0 {
            Some(cost / benefit)
        } else {
            Some(f64::INFINITY)
        }
    }
}

/// A unit of work handed to a cycle.
///
/// `subtasks` are candidate micro-tasks; whether they become micro-cycles is
/// decided by the phase handler and the recursion heuristics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleTask {
    pub id: String,
    pub description: String,
    /// Category used to look up historical recursion effectiveness.
    pub task_type: Option<String>,
    pub domain: Option<String>,
    pub metrics: TaskMetrics,
    pub subtasks: Vec<CycleTask>,
}

impl CycleTask {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_metrics(mut self, metrics: TaskMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_subtask(mut self, subtask: CycleTask) -> Self {
        self.subtasks.push(subtask);
        self
    }

    /// Lowercased free text used for expertise matching.
    pub fn search_text(&self) -> String {
        let mut text = self.description.to_lowercase();
        for extra in [&self.task_type, &self.domain].into_iter().flatten() {
            text.push(' ');
            text.push_str(&extra.to_lowercase());
        }
        text
    }
}
