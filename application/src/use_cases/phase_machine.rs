//! Phase state machine.
//!
//! Drives a cycle through `expand → differentiate → refine → retrospect →
//! completed`. A request for anything but the next phase is rejected before
//! the handler runs, and a failing handler leaves both the phase and the
//! context as they were.

use crate::ports::phase_handler::{PhaseHandler, PhaseHandlerError};
use crate::use_cases::context_merge::{ContextMergeEngine, MergeError};
use crate::use_cases::memory_sync::FlushReceipt;
use edrr_domain::{Cycle, CycleId, CycleStatus, DomainError, Phase, PhaseOutput};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhaseError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Phase {phase} of cycle {cycle} failed: {source}")]
    PhaseExecution {
        cycle: CycleId,
        phase: Phase,
        #[source]
        source: PhaseHandlerError,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),
}

impl PhaseError {
    pub fn is_ordering_violation(&self) -> bool {
        matches!(self, PhaseError::Domain(e) if e.is_ordering_violation())
    }
}

pub struct PhaseMachine {
    handler: Arc<dyn PhaseHandler>,
    contexts: Arc<ContextMergeEngine>,
}

impl PhaseMachine {
    pub fn new(handler: Arc<dyn PhaseHandler>, contexts: Arc<ContextMergeEngine>) -> Self {
        Self { handler, contexts }
    }

    pub fn contexts(&self) -> &ContextMergeEngine {
        &self.contexts
    }

    /// Run `expand` for a pending cycle and mark it active.
    pub async fn start(&self, cycle: &mut Cycle) -> Result<PhaseOutput, PhaseError> {
        if cycle.status() != CycleStatus::Pending {
            return Err(DomainError::AlreadyStarted(cycle.id().clone()).into());
        }
        self.contexts.register(cycle.id());

        let output = self.run_handler(cycle, Phase::Expand).await?;
        cycle.mark_started()?;
        info!(cycle = %cycle.id(), depth = cycle.depth(), "Cycle started");
        Ok(output)
    }

    /// Move to `requested`, which must be the phase right after the current one.
    pub async fn advance(
        &self,
        cycle: &mut Cycle,
        requested: Phase,
    ) -> Result<PhaseOutput, PhaseError> {
        cycle.check_transition(requested)?;
        if requested.is_terminal() {
            return Err(DomainError::OrderingViolation {
                cycle: cycle.id().clone(),
                from: cycle.phase(),
                requested,
            }
            .into());
        }

        let output = self.run_handler(cycle, requested).await?;
        let previous = cycle.transition_to(requested)?;
        debug!(cycle = %cycle.id(), from = %previous, to = %requested, "Phase transition");
        Ok(output)
    }

    /// Close a cycle in `retrospect`. The receipt proves the boundary flush ran.
    pub fn complete(&self, cycle: &mut Cycle, receipt: FlushReceipt) -> Result<(), PhaseError> {
        cycle.complete()?;
        info!(
            cycle = %cycle.id(),
            sync = receipt.outcome().as_str(),
            "Cycle completed"
        );
        Ok(())
    }

    async fn run_handler(&self, cycle: &Cycle, phase: Phase) -> Result<PhaseOutput, PhaseError> {
        let context = self.contexts.context(cycle.id())?;
        let output = self
            .handler
            .execute(phase, cycle, &context)
            .await
            .map_err(|source| PhaseError::PhaseExecution {
                cycle: cycle.id().clone(),
                phase,
                source,
            })?;
        self.contexts.merge(cycle.id(), &output)?;
        Ok(output)
    }
}
