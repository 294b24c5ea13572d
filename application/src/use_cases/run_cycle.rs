//! Run Cycle use case
//!
//! Orchestrates a full EDRR run: the root cycle walks its four working phases,
//! each phase may open micro-cycles that run to completion before the parent
//! moves on, and memory is flushed at every phase boundary.
//!
//! Per phase the coordinator:
//! 1. rotates the primus and records the role assignment
//! 2. runs the phase handler through the [`PhaseMachine`]
//! 3. runs the team step (expand: proposals, differentiate: vote,
//!    refine: critique of the selected proposal)
//! 4. checks the handler's metrics against the quality gate, when one is set
//! 5. spawns the micro-cycles the handler asked for
//! 6. flushes the memory queue
//!
//! A closed gate is reported in [`CycleReport::gates`]; the cycle still moves
//! on to the next phase.
//!
//! A micro-cycle flushes only its own records: the parent's pending updates
//! are set aside while the child runs and flushed at the parent's boundary.

use crate::config::EdrrConfig;
use crate::ports::agent::Agent;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::memory_manager::MemoryManager;
use crate::ports::memory_store::MemoryStore;
use crate::ports::phase_handler::PhaseHandler;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::use_cases::consensus::ConsensusEngine;
use crate::use_cases::context_merge::{ContextMergeEngine, MergeError};
use crate::use_cases::hooks::HookRegistry;
use crate::use_cases::memory_sync::{FlushOutcome, FlushReceipt, MemorySyncCoordinator, MemorySyncError};
use crate::use_cases::phase_gate::{GateVerdict, PhaseGate};
use crate::use_cases::phase_machine::{PhaseError, PhaseMachine};
use crate::use_cases::recursion::{RecursionError, RecursionManager, SpawnEnvironment, SpawnOutcome};
use crate::use_cases::registry::CycleRegistry;
use edrr_domain::recursion::step_bound;
use edrr_domain::{
    Context, Cycle, CycleId, CycleStatus, CycleTask, Decision, DomainError, EffectivenessRecord,
    MemoryKey, Phase, PhaseOutput, Proposal, RecordKind, RoleAssignment, TerminationDecision,
    TerminationEvaluator,
};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("Cycle {0} is not registered")]
    UnknownCycle(CycleId),
}

/// Lifecycle notifications for cycle hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleEvent {
    CycleStarted {
        cycle: CycleId,
        depth: u32,
    },
    PhaseCompleted {
        cycle: CycleId,
        phase: Phase,
    },
    MicroCycleSpawned {
        parent: CycleId,
        child: CycleId,
        phase: Phase,
    },
    RecursionDeclined {
        parent: CycleId,
        task: String,
        reason: &'static str,
    },
    CycleCompleted {
        cycle: CycleId,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub id: CycleId,
    pub parent: Option<CycleId>,
    pub task_id: String,
    pub depth: u32,
    pub phase: Phase,
    pub status: CycleStatus,
}

impl From<&Cycle> for CycleSummary {
    fn from(cycle: &Cycle) -> Self {
        Self {
            id: cycle.id().clone(),
            parent: cycle.parent_id().cloned(),
            task_id: cycle.task().id.clone(),
            depth: cycle.depth(),
            phase: cycle.phase(),
            status: cycle.status(),
        }
    }
}

/// A micro-cycle the termination heuristics refused.
#[derive(Debug, Clone, Serialize)]
pub struct DeclinedSpawn {
    pub parent: CycleId,
    pub phase: Phase,
    pub task_id: String,
    pub decision: TerminationDecision,
}

/// Outcome of one phase-boundary flush.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRecord {
    pub cycle: CycleId,
    pub phase: Phase,
    pub outcome: FlushOutcome,
    pub flushed: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub root_id: CycleId,
    pub final_context: Context,
    pub cycles: Vec<CycleSummary>,
    pub decisions: Vec<Decision>,
    pub declined: Vec<DeclinedSpawn>,
    pub recursion_errors: Vec<String>,
    pub sync: Vec<SyncRecord>,
    /// Quality gate verdicts, one per gated phase execution.
    pub gates: Vec<GateVerdict>,
    /// Phase executions, completions and spawns performed.
    pub steps: u64,
    /// Upper bound on `steps` for the configured depth and spawn budget.
    pub step_bound: u64,
    pub elapsed_ms: u64,
}

impl CycleReport {
    pub fn max_depth(&self) -> u32 {
        self.cycles.iter().map(|c| c.depth).max().unwrap_or(0)
    }

    pub fn all_completed(&self) -> bool {
        self.cycles.iter().all(|c| c.status == CycleStatus::Completed)
    }

    /// Gated phases that were not ready when the cycle moved on.
    pub fn not_ready(&self) -> impl Iterator<Item = &GateVerdict> {
        self.gates.iter().filter(|verdict| !verdict.ready)
    }
}

/// Mutable bookkeeping for one run.
struct RunState {
    registry: CycleRegistry,
    started: Instant,
    steps: u64,
    decisions: Vec<Decision>,
    declined: Vec<DeclinedSpawn>,
    recursion_errors: Vec<String>,
    sync: Vec<SyncRecord>,
    gates: Vec<GateVerdict>,
    history: Vec<EffectivenessRecord>,
    proposals: HashMap<CycleId, Vec<Proposal>>,
    selected: HashMap<CycleId, Decision>,
}

impl RunState {
    fn new() -> Self {
        Self {
            registry: CycleRegistry::new(),
            started: Instant::now(),
            steps: 0,
            decisions: Vec::new(),
            declined: Vec::new(),
            recursion_errors: Vec::new(),
            sync: Vec::new(),
            gates: Vec::new(),
            history: Vec::new(),
            proposals: HashMap::new(),
            selected: HashMap::new(),
        }
    }

    fn cycle(&self, id: &CycleId) -> Result<&Cycle, CoordinatorError> {
        self.registry
            .get(id)
            .ok_or_else(|| CoordinatorError::UnknownCycle(id.clone()))
    }

    fn cycle_mut(&mut self, id: &CycleId) -> Result<&mut Cycle, CoordinatorError> {
        self.registry
            .get_mut(id)
            .ok_or_else(|| CoordinatorError::UnknownCycle(id.clone()))
    }
}

/// The EDRR coordinator
pub struct EdrrCoordinator {
    config: EdrrConfig,
    machine: PhaseMachine,
    contexts: Arc<ContextMergeEngine>,
    recursion: RecursionManager,
    consensus: ConsensusEngine,
    sync: Arc<MemorySyncCoordinator>,
    gate: Option<PhaseGate>,
    audit: Arc<dyn AuditLogger>,
    hooks: HookRegistry<CycleEvent>,
}

impl EdrrCoordinator {
    pub fn new(
        config: EdrrConfig,
        handler: Arc<dyn PhaseHandler>,
        agents: Vec<Arc<dyn Agent>>,
        stores: Vec<Arc<dyn MemoryStore>>,
    ) -> Self {
        let contexts = Arc::new(ContextMergeEngine::new());
        let sync = Arc::new(MemorySyncCoordinator::new(stores));
        let evaluator =
            TerminationEvaluator::standard(config.thresholds.clone(), config.limits.clone());

        Self {
            machine: PhaseMachine::new(handler, Arc::clone(&contexts)),
            recursion: RecursionManager::new(config.recursion.clone(), evaluator),
            consensus: ConsensusEngine::new(
                agents,
                config.consensus.clone(),
                Arc::clone(&sync) as Arc<dyn MemoryManager>,
            ),
            contexts,
            sync,
            gate: config.quality_gate.clone().map(PhaseGate::new),
            audit: Arc::new(NoAuditLogger),
            hooks: HookRegistry::new(),
            config,
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.consensus = self.consensus.with_audit(Arc::clone(&audit));
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &EdrrConfig {
        &self.config
    }

    pub fn consensus(&self) -> &ConsensusEngine {
        &self.consensus
    }

    pub fn memory(&self) -> &MemorySyncCoordinator {
        &self.sync
    }

    /// The quality gate, for registering recovery and failure hooks.
    pub fn phase_gate(&self) -> Option<&PhaseGate> {
        self.gate.as_ref()
    }

    pub fn register_cycle_hook<F>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn(&CycleEvent) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.register(name, hook);
    }

    /// Execute a run with default (no-op) progress
    pub async fn run(&self, task: CycleTask) -> Result<CycleReport, CoordinatorError> {
        self.run_with_progress(task, &NoProgress).await
    }

    /// Execute a run with progress callbacks
    pub async fn run_with_progress(
        &self,
        task: CycleTask,
        progress: &dyn ProgressNotifier,
    ) -> Result<CycleReport, CoordinatorError> {
        if task.description.trim().is_empty() {
            return Err(DomainError::InvalidTask("task description is empty".into()).into());
        }

        let max_depth = self.recursion.max_depth();
        let budget = self.recursion.spawn_budget();
        info!(
            task = %task.id,
            max_depth,
            agents = self.consensus.agent_count(),
            stores = self.sync.store_names().len(),
            "Starting EDRR run"
        );

        let mut state = RunState::new();
        let root_id = state.registry.insert(Cycle::root(task));
        self.run_cycle(root_id.clone(), &mut state, progress).await?;

        let report = CycleReport {
            final_context: self.contexts.context(&root_id)?,
            cycles: state.registry.iter().map(CycleSummary::from).collect(),
            decisions: state.decisions,
            declined: state.declined,
            recursion_errors: state.recursion_errors,
            sync: state.sync,
            gates: state.gates,
            steps: state.steps,
            step_bound: step_bound(max_depth, budget),
            elapsed_ms: state.started.elapsed().as_millis() as u64,
            root_id,
        };
        info!(
            cycles = report.cycles.len(),
            steps = report.steps,
            bound = report.step_bound,
            "EDRR run finished"
        );
        Ok(report)
    }

    fn run_cycle<'a>(
        &'a self,
        id: CycleId,
        state: &'a mut RunState,
        progress: &'a dyn ProgressNotifier,
    ) -> BoxFuture<'a, Result<(), CoordinatorError>> {
        async move {
            let (depth, task_id) = {
                let cycle = state.cycle(&id)?;
                (cycle.depth(), cycle.task().id.clone())
            };
            info!(cycle = %id, task = %task_id, depth, "Cycle started");
            self.audit.log(AuditEvent::new(
                "cycle_started",
                json!({ "cycle": id.as_str(), "task": task_id, "depth": depth }),
            ));
            self.hooks.emit(&CycleEvent::CycleStarted {
                cycle: id.clone(),
                depth,
            });

            for phase in Phase::WORKING {
                self.run_phase(&id, phase, state, progress).await?;

                if phase == Phase::Retrospect {
                    let summary = self.contexts.context(&id)?.to_value();
                    self.sync.write(
                        MemoryKey::new(None, task_id.clone(), RecordKind::CycleSummary),
                        summary,
                    );
                }

                let receipt = self.flush_boundary(&id, phase, state).await;
                if phase == Phase::Retrospect {
                    self.finish(&id, receipt, state, progress)?;
                }
            }
            Ok(())
        }
        .boxed()
    }

    async fn run_phase(
        &self,
        id: &CycleId,
        phase: Phase,
        state: &mut RunState,
        progress: &dyn ProgressNotifier,
    ) -> Result<(), CoordinatorError> {
        let task = state.cycle(id)?.task().clone();

        let roles = self.consensus.assign_roles(&task, phase);
        if let Some(roles) = &roles {
            self.record(
                MemoryKey::in_phase(phase, task.id.clone(), RecordKind::RoleAssignment),
                roles,
            );
        }

        progress.on_phase_start(state.cycle(id)?, phase);
        let output = {
            let cycle = state.cycle_mut(id)?;
            let previous = cycle.phase();
            let output = if phase == Phase::Expand {
                self.machine.start(cycle).await?
            } else {
                self.machine.advance(cycle, phase).await?
            };
            self.record(
                MemoryKey::in_phase(phase, task.id.clone(), RecordKind::PhaseTransition),
                &json!({ "cycle": id.as_str(), "from": previous, "to": phase }),
            );
            output
        };
        state.steps += 1;

        self.collaborate(id, phase, &task, roles.as_ref(), state, progress)
            .await?;

        self.record(
            MemoryKey::in_phase(phase, task.id.clone(), RecordKind::PhaseResult),
            &output.fields,
        );
        if let Some(gate) = &self.gate {
            let verdict = gate.evaluate(id, phase, output.metrics.clone());
            let failing: Vec<&str> = verdict.check.failing().map(|(m, _)| m.as_str()).collect();
            self.audit.log(AuditEvent::new(
                "phase_gate",
                json!({
                    "cycle": id.as_str(),
                    "phase": phase.as_str(),
                    "ready": verdict.ready,
                    "recovered": verdict.recovered,
                    "failing": failing,
                }),
            ));
            state.gates.push(verdict);
        }
        progress.on_phase_complete(state.cycle(id)?, phase);
        self.audit.log(AuditEvent::new(
            "phase_completed",
            json!({ "cycle": id.as_str(), "phase": phase.as_str(), "fields": output.fields.len() }),
        ));
        self.hooks.emit(&CycleEvent::PhaseCompleted {
            cycle: id.clone(),
            phase,
        });

        self.spawn_micro_cycles(id, phase, output.micro_tasks, state, progress)
            .await
    }

    /// Team step of a phase; its results are merged into the cycle context.
    async fn collaborate(
        &self,
        id: &CycleId,
        phase: Phase,
        task: &CycleTask,
        roles: Option<&RoleAssignment>,
        state: &mut RunState,
        progress: &dyn ProgressNotifier,
    ) -> Result<(), CoordinatorError> {
        let context = self.contexts.context(id)?;

        match phase {
            Phase::Expand => {
                let proposals = self.consensus.gather_proposals(task, &context).await;
                if !proposals.is_empty() {
                    let output = PhaseOutput::new(format!("wsde:{phase}"))
                        .with_field("proposals", to_json(&proposals));
                    self.contexts.merge(id, &output)?;
                }
                state.proposals.insert(id.clone(), proposals);
            }
            Phase::Differentiate => {
                let mut options: Vec<String> = Vec::new();
                for proposal in state.proposals.get(id).into_iter().flatten() {
                    if !options.contains(&proposal.option) {
                        options.push(proposal.option.clone());
                    }
                }
                if options.is_empty() {
                    debug!(cycle = %id, "No proposals to vote on");
                    return Ok(());
                }

                if let Some(decision) = self
                    .consensus
                    .decide(&task.id, phase, options, &context, roles)
                    .await
                {
                    progress.on_decision(&decision);
                    let output = PhaseOutput::new(format!("wsde:{phase}")).with_field(
                        "decision",
                        json!({
                            "topic": decision.topic,
                            "chosen": decision.chosen(),
                            "method": decision.method.as_str(),
                            "tie_break": decision.tie_break,
                        }),
                    );
                    self.contexts.merge(id, &output)?;
                    state.selected.insert(id.clone(), decision.clone());
                    state.decisions.push(decision);
                }
            }
            Phase::Refine => {
                let Some(decision) = state.selected.get(id) else {
                    return Ok(());
                };
                let refined = match &decision.critique {
                    Some(critique) => json!({
                        "thesis": critique.thesis,
                        "antithesis": critique.antithesis,
                        "synthesis": critique.synthesis,
                        "critic": critique.critic,
                    }),
                    None => json!({ "synthesis": decision.chosen() }),
                };
                let output =
                    PhaseOutput::new(format!("wsde:{phase}")).with_field("refined_proposal", refined);
                self.contexts.merge(id, &output)?;
            }
            Phase::Retrospect | Phase::Completed => {}
        }
        Ok(())
    }

    async fn spawn_micro_cycles(
        &self,
        id: &CycleId,
        phase: Phase,
        micro_tasks: Vec<CycleTask>,
        state: &mut RunState,
        progress: &dyn ProgressNotifier,
    ) -> Result<(), CoordinatorError> {
        let budget = self.recursion.spawn_budget() as usize;
        if micro_tasks.len() > budget {
            warn!(
                cycle = %id,
                phase = %phase,
                "Skipping {} micro-task(s) over the per-phase budget of {}",
                micro_tasks.len() - budget,
                budget
            );
        }

        for task in micro_tasks.into_iter().take(budget) {
            let task_id = task.id.clone();
            let task_type = task.task_type.clone();
            let quality = task.metrics.quality_score;

            let env = SpawnEnvironment {
                elapsed: state.started.elapsed(),
                memory_usage: self.contexts.total_bytes(),
                history: &state.history,
            };
            let outcome =
                self.recursion
                    .spawn_micro_cycle(&mut state.registry, id, phase, task, &env);

            match outcome {
                Ok(SpawnOutcome::Spawned { child, .. }) => {
                    state.steps += 1;
                    progress.on_micro_cycle(id, state.cycle(&child)?);
                    self.record(
                        MemoryKey::in_phase(phase, task_id.clone(), RecordKind::MicroCycle),
                        &json!({ "parent": id.as_str(), "child": child.as_str() }),
                    );
                    self.audit.log(AuditEvent::new(
                        "micro_cycle_spawned",
                        json!({
                            "parent": id.as_str(),
                            "child": child.as_str(),
                            "phase": phase.as_str(),
                            "task": task_id,
                        }),
                    ));
                    self.hooks.emit(&CycleEvent::MicroCycleSpawned {
                        parent: id.clone(),
                        child: child.clone(),
                        phase,
                    });

                    let parked = self.sync.take_pending();
                    let result = self.run_cycle(child.clone(), state, progress).await;
                    self.sync.restore_queue(parked);
                    result?;
                    self.absorb_child(id, &child, &task_id, task_type, quality, state)?;
                }
                Ok(SpawnOutcome::Declined(decision)) => {
                    progress.on_spawn_declined(id, &decision);
                    self.audit.log(AuditEvent::new(
                        "recursion_declined",
                        json!({
                            "parent": id.as_str(),
                            "task": task_id,
                            "reason": decision.reason(),
                            "detail": decision.detail,
                        }),
                    ));
                    self.hooks.emit(&CycleEvent::RecursionDeclined {
                        parent: id.clone(),
                        task: task_id.clone(),
                        reason: decision.reason(),
                    });
                    state.declined.push(DeclinedSpawn {
                        parent: id.clone(),
                        phase,
                        task_id,
                        decision,
                    });
                }
                Err(e) => {
                    warn!(cycle = %id, task = %task_id, "Micro-cycle not spawned: {}", e);
                    if let RecursionError::Limit { depth, max_depth } = &e {
                        self.audit.log(AuditEvent::new(
                            "recursion_limit",
                            json!({
                                "parent": id.as_str(),
                                "task": task_id,
                                "depth": depth,
                                "max_depth": max_depth,
                            }),
                        ));
                    }
                    state.recursion_errors.push(e.to_string());
                }
            }
        }
        Ok(())
    }

    /// Fold a finished micro-cycle into its parent's context.
    fn absorb_child(
        &self,
        parent: &CycleId,
        child: &CycleId,
        task_id: &str,
        task_type: Option<String>,
        quality: Option<f64>,
        state: &mut RunState,
    ) -> Result<(), CoordinatorError> {
        let child_context = self.contexts.context(child)?;
        let mut output = PhaseOutput::new(format!("micro_cycle:{child}")).with_field(
            "micro_cycle_results",
            json!([{
                "child": child.as_str(),
                "task": task_id,
                "result": child_context.to_value(),
            }]),
        );

        if let Some(task_type) = task_type {
            let effectiveness = quality.unwrap_or(1.0);
            output = output.with_field(
                "recursion_history",
                json!([{ "task_type": task_type, "effectiveness": effectiveness, "cycle": child.as_str() }]),
            );
            state.history.push(EffectivenessRecord {
                task_type,
                effectiveness,
                cycle_id: child.to_string(),
            });
        }

        self.contexts.merge(parent, &output)?;
        Ok(())
    }

    async fn flush_boundary(&self, id: &CycleId, phase: Phase, state: &mut RunState) -> FlushReceipt {
        let receipt = match self.sync.flush().await {
            Ok(receipt) => receipt,
            Err(e) => {
                match &e {
                    MemorySyncError::NoStores { .. } => debug!("{}", e),
                    MemorySyncError::RolledBack { .. } => {
                        warn!(cycle = %id, phase = %phase, "Memory sync failed: {}", e)
                    }
                }
                e.receipt()
            }
        };

        self.audit.log(AuditEvent::new(
            "memory_sync",
            json!({
                "cycle": id.as_str(),
                "phase": phase.as_str(),
                "outcome": receipt.outcome().as_str(),
                "flushed": receipt.flushed().len(),
            }),
        ));
        state.sync.push(SyncRecord {
            cycle: id.clone(),
            phase,
            outcome: receipt.outcome(),
            flushed: receipt.flushed().len(),
        });
        receipt
    }

    fn finish(
        &self,
        id: &CycleId,
        receipt: FlushReceipt,
        state: &mut RunState,
        progress: &dyn ProgressNotifier,
    ) -> Result<(), CoordinatorError> {
        let cycle = state.cycle_mut(id)?;
        self.machine.complete(cycle, receipt)?;
        progress.on_cycle_complete(cycle);
        state.steps += 1;

        self.audit.log(AuditEvent::new(
            "cycle_completed",
            json!({ "cycle": id.as_str() }),
        ));
        self.hooks.emit(&CycleEvent::CycleCompleted { cycle: id.clone() });
        Ok(())
    }

    /// Queue a JSON record for the next flush.
    fn record<T: Serialize + ?Sized>(&self, key: MemoryKey, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.sync.write(key, value),
            Err(e) => warn!("Failed to serialize {} record: {}", key, e),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
