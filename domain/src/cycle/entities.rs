//! Cycle domain entities

use super::value_objects::{CycleId, CycleTask};
use crate::core::error::DomainError;
use crate::recursion::variant;
use serde::{Deserialize, Serialize};

/// Phase of an EDRR cycle.
///
/// The order is fixed: `Expand → Differentiate → Refine → Retrospect → Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Divergent exploration - agents propose candidate approaches
    Expand,
    /// Comparison and selection among the candidates
    Differentiate,
    /// Elaboration and critique of the selected approach
    Refine,
    /// Reflection on the cycle's outcome
    Retrospect,
    /// Terminal state
    Completed,
}

impl Phase {
    /// The four phases that execute a handler, in order.
    pub const WORKING: [Phase; 4] = [
        Phase::Expand,
        Phase::Differentiate,
        Phase::Refine,
        Phase::Retrospect,
    ];

    /// The single phase that may follow this one.
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Expand => Some(Phase::Differentiate),
            Phase::Differentiate => Some(Phase::Refine),
            Phase::Refine => Some(Phase::Retrospect),
            Phase::Retrospect => Some(Phase::Completed),
            Phase::Completed => None,
        }
    }

    /// Number of transitions left before reaching `Completed`.
    pub fn remaining(self) -> u32 {
        match self {
            Phase::Expand => 4,
            Phase::Differentiate => 3,
            Phase::Refine => 2,
            Phase::Retrospect => 1,
            Phase::Completed => 0,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Expand => "expand",
            Phase::Differentiate => "differentiate",
            Phase::Refine => "refine",
            Phase::Retrospect => "retrospect",
            Phase::Completed => "completed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Expand => "Expand",
            Phase::Differentiate => "Differentiate",
            Phase::Refine => "Refine",
            Phase::Retrospect => "Retrospect",
            Phase::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expand" => Ok(Phase::Expand),
            "differentiate" => Ok(Phase::Differentiate),
            "refine" => Ok(Phase::Refine),
            "retrospect" => Ok(Phase::Retrospect),
            "completed" => Ok(Phase::Completed),
            _ => Err(format!(
                "Unknown phase: {}. Valid: expand, differentiate, refine, retrospect, completed",
                s
            )),
        }
    }
}

/// Lifecycle status of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Created, expand handler not executed yet
    Pending,
    /// Executing phases
    Active,
    /// Reached the terminal phase
    Completed,
}

/// A single EDRR cycle (Entity)
///
/// Phase changes go exclusively through [`Cycle::mark_started`],
/// [`Cycle::transition_to`] and [`Cycle::complete`], each of which checks the
/// linear order before mutating anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    id: CycleId,
    task: CycleTask,
    phase: Phase,
    depth: u32,
    parent_id: Option<CycleId>,
    /// Phase of the parent during which this cycle was spawned.
    parent_phase: Option<Phase>,
    status: CycleStatus,
}

impl Cycle {
    /// Create a top-level cycle.
    pub fn root(task: CycleTask) -> Self {
        Self {
            id: CycleId::generate(),
            task,
            phase: Phase::Expand,
            depth: 0,
            parent_id: None,
            parent_phase: None,
            status: CycleStatus::Pending,
        }
    }

    /// Create a micro-cycle one level below `parent`.
    pub fn child_of(parent: &Cycle, parent_phase: Phase, task: CycleTask) -> Self {
        Self {
            id: CycleId::generate(),
            task,
            phase: Phase::Expand,
            depth: parent.depth + 1,
            parent_id: Some(parent.id.clone()),
            parent_phase: Some(parent_phase),
            status: CycleStatus::Pending,
        }
    }

    pub fn id(&self) -> &CycleId {
        &self.id
    }

    pub fn task(&self) -> &CycleTask {
        &self.task
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn parent_id(&self) -> Option<&CycleId> {
        self.parent_id.as_ref()
    }

    pub fn parent_phase(&self) -> Option<Phase> {
        self.parent_phase
    }

    pub fn status(&self) -> CycleStatus {
        self.status
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.status == CycleStatus::Completed
    }

    /// Well-founded variant `φ = 4·(max_depth − depth) + remaining phases`.
    pub fn variant(&self, max_depth: u32) -> u64 {
        variant::phi(max_depth, self.depth, self.phase)
    }

    /// Check that `requested` is the single valid next phase.
    pub fn check_transition(&self, requested: Phase) -> Result<(), DomainError> {
        if self.status == CycleStatus::Pending {
            return Err(DomainError::NotStarted(self.id.clone()));
        }
        if self.phase.next() != Some(requested) {
            return Err(DomainError::OrderingViolation {
                cycle: self.id.clone(),
                from: self.phase,
                requested,
            });
        }
        Ok(())
    }

    /// Record that the expand handler ran.
    pub fn mark_started(&mut self) -> Result<(), DomainError> {
        if self.status != CycleStatus::Pending {
            return Err(DomainError::AlreadyStarted(self.id.clone()));
        }
        self.status = CycleStatus::Active;
        Ok(())
    }

    /// Move to the next working phase. Returns the previous phase.
    ///
    /// `Completed` is reachable only through [`Cycle::complete`].
    pub fn transition_to(&mut self, requested: Phase) -> Result<Phase, DomainError> {
        self.check_transition(requested)?;
        if requested.is_terminal() {
            return Err(DomainError::OrderingViolation {
                cycle: self.id.clone(),
                from: self.phase,
                requested,
            });
        }
        let previous = self.phase;
        self.phase = requested;
        Ok(previous)
    }

    /// Move from `Retrospect` to `Completed`.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.check_transition(Phase::Completed)?;
        self.phase = Phase::Completed;
        self.status = CycleStatus::Completed;
        Ok(())
    }
}
