//! Reference phase handler driven by the task description.
//!
//! Each phase appends a line to `phase_log` and writes one phase-specific
//! field. Expand also hands the task's declared subtasks to the coordinator
//! as micro-cycle candidates. A task's own quality score is reported as the
//! phase's quality metric for the quality gate.

use async_trait::async_trait;
use edrr_application::{PhaseHandler, PhaseHandlerError};
use edrr_domain::{Context, Cycle, MetricKind, Phase, PhaseOutput};
use serde_json::{Value, json};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct TaskPhaseHandler;

impl TaskPhaseHandler {
    pub fn new() -> Self {
        Self
    }
}

fn array_len(context: &Context, key: &str) -> usize {
    context
        .get(key)
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

#[async_trait]
impl PhaseHandler for TaskPhaseHandler {
    async fn execute(
        &self,
        phase: Phase,
        cycle: &Cycle,
        context: &Context,
    ) -> Result<PhaseOutput, PhaseHandlerError> {
        let task = cycle.task();
        let mut output = PhaseOutput::new(format!("{}:{}", cycle.id(), phase))
            .with_field("phase_log", json!([format!("{}:{}", task.id, phase)]));
        if let Some(quality) = task.metrics.quality_score {
            output = output.with_metric(MetricKind::Quality, quality);
        }

        let output = match phase {
            Phase::Expand => {
                let mut ideas = vec![task.description.clone()];
                ideas.extend(task.subtasks.iter().map(|s| s.description.clone()));
                let mut output = output.with_field("ideas", json!(ideas));
                output.micro_tasks = task.subtasks.clone();
                output
            }
            Phase::Differentiate => output.with_field(
                "comparison",
                json!({
                    "ideas": array_len(context, "ideas"),
                    "proposals": array_len(context, "proposals"),
                }),
            ),
            Phase::Refine => {
                let chosen = context
                    .get("decision")
                    .and_then(|d| d.get("chosen"))
                    .cloned()
                    .unwrap_or_else(|| json!(task.description));
                output.with_field("plan", json!({ "task": task.id, "basis": chosen }))
            }
            Phase::Retrospect => output.with_field(
                "learnings",
                json!([{
                    "task": task.id,
                    "depth": cycle.depth(),
                    "phases_logged": array_len(context, "phase_log"),
                    "micro_cycles": array_len(context, "micro_cycle_results"),
                }]),
            ),
            Phase::Completed => return Err(PhaseHandlerError::Unsupported(phase)),
        };

        debug!(cycle = %cycle.id(), phase = %phase, "Phase handled");
        Ok(output)
    }
}
