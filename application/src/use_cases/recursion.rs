//! Recursion manager.
//!
//! Decides whether a phase may open a nested micro-cycle. The hard depth limit
//! and the per-phase budget are structural errors; everything else goes
//! through the termination heuristics, which may decline the spawn.

use crate::config::RecursionConfig;
use crate::use_cases::registry::CycleRegistry;
use edrr_domain::{
    Cycle, CycleId, CycleTask, EffectivenessRecord, Phase, TerminationDecision,
    TerminationEvaluator, TerminationProbe,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecursionError {
    #[error("Recursion limit reached: depth {depth} >= max depth {max_depth}")]
    Limit { depth: u32, max_depth: u32 },

    #[error("Unknown parent cycle {0}")]
    UnknownCycle(CycleId),

    #[error("Phase {phase} of cycle {parent} already spawned {budget} micro-cycle(s)")]
    SpawnBudget {
        parent: CycleId,
        phase: Phase,
        budget: u32,
    },

    #[error("Spawn would not decrease the variant ({parent} -> {child})")]
    VariantNotDecreasing { parent: u64, child: u64 },
}

/// Run-wide measurements handed to the termination heuristics.
#[derive(Debug, Clone, Copy)]
pub struct SpawnEnvironment<'a> {
    pub elapsed: Duration,
    /// Estimated bytes of context memory held by the run.
    pub memory_usage: u64,
    pub history: &'a [EffectivenessRecord],
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpawnOutcome {
    Spawned {
        child: CycleId,
        decision: TerminationDecision,
    },
    /// The heuristics asked to stop; no child was created.
    Declined(TerminationDecision),
}

impl SpawnOutcome {
    pub fn child(&self) -> Option<&CycleId> {
        match self {
            SpawnOutcome::Spawned { child, .. } => Some(child),
            SpawnOutcome::Declined(_) => None,
        }
    }

    pub fn decision(&self) -> &TerminationDecision {
        match self {
            SpawnOutcome::Spawned { decision, .. } => decision,
            SpawnOutcome::Declined(decision) => decision,
        }
    }
}

pub struct RecursionManager {
    config: RecursionConfig,
    evaluator: TerminationEvaluator,
}

impl RecursionManager {
    pub fn new(config: RecursionConfig, evaluator: TerminationEvaluator) -> Self {
        Self { config, evaluator }
    }

    pub fn max_depth(&self) -> u32 {
        self.config.max_depth()
    }

    pub fn spawn_budget(&self) -> u32 {
        self.config.max_micro_cycles_per_phase
    }

    pub fn evaluator(&self) -> &TerminationEvaluator {
        &self.evaluator
    }

    /// Try to create a micro-cycle of `parent_id` for `target_phase`.
    pub fn spawn_micro_cycle(
        &self,
        registry: &mut CycleRegistry,
        parent_id: &CycleId,
        target_phase: Phase,
        task: CycleTask,
        env: &SpawnEnvironment<'_>,
    ) -> Result<SpawnOutcome, RecursionError> {
        let max_depth = self.config.max_depth();
        let parent = registry
            .get(parent_id)
            .ok_or_else(|| RecursionError::UnknownCycle(parent_id.clone()))?;

        if parent.depth() >= max_depth {
            return Err(RecursionError::Limit {
                depth: parent.depth(),
                max_depth,
            });
        }

        let budget = self.config.max_micro_cycles_per_phase;
        if registry.spawn_count(parent_id, target_phase) >= budget {
            return Err(RecursionError::SpawnBudget {
                parent: parent_id.clone(),
                phase: target_phase,
                budget,
            });
        }

        let probe = TerminationProbe {
            task: &task,
            parent_depth: parent.depth(),
            max_depth,
            target_phase,
            parent_phase: parent.phase(),
            parent_origin: parent.parent_phase(),
            elapsed: env.elapsed,
            memory_usage: env.memory_usage,
            history: env.history,
        };
        let decision = self.evaluator.evaluate(&probe);
        if decision.terminate {
            info!(
                parent = %parent_id,
                task = %task.id,
                reason = decision.reason(),
                "Micro-cycle declined: {}",
                decision.detail
            );
            return Ok(SpawnOutcome::Declined(decision));
        }

        let child = Cycle::child_of(parent, target_phase, task);
        let (parent_phi, child_phi) = (parent.variant(max_depth), child.variant(max_depth));
        if child_phi >= parent_phi {
            return Err(RecursionError::VariantNotDecreasing {
                parent: parent_phi,
                child: child_phi,
            });
        }

        debug!(
            parent = %parent_id,
            child = %child.id(),
            depth = child.depth(),
            phi = child_phi,
            "Micro-cycle spawned"
        );
        let child_id = registry.insert(child);
        registry.record_spawn(parent_id, target_phase);
        Ok(SpawnOutcome::Spawned {
            child: child_id,
            decision,
        })
    }
}
