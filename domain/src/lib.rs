//! Domain layer for the EDRR orchestrator
//!
//! This crate contains the core entities, value objects and pure algorithms.
//! It has no dependencies on infrastructure or I/O.
//!
//! # Core Concepts
//!
//! ## EDRR cycles
//!
//! A [`Cycle`] walks `Expand → Differentiate → Refine → Retrospect → Completed`
//! in a fixed order. Phases may spawn nested micro-cycles, bounded by the
//! recursion depth and the termination heuristics in [`recursion`].
//!
//! ## Context
//!
//! Phases share state only through a [`Context`], which changes by merging
//! [`PhaseOutput`]s (idempotent and associative).
//!
//! ## WSDE consensus
//!
//! Teams of agents with rotating roles decide between options by weighted
//! vote, falling back to a synthesis when the vote ties.

pub mod config;
pub mod consensus;
pub mod context;
pub mod core;
pub mod cycle;
pub mod memory;
pub mod recursion;
pub mod wsde;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use consensus::{
    ConsensusFailure, Critique, Decision, DecisionOutcome, DialecticalCritique, Proposal,
    SynthesisProposal, Tally, Vote, VotingMethod,
};
pub use context::{Context, ContextSnapshot, MergeRecord, PhaseOutput};
pub use core::error::DomainError;
pub use cycle::{
    Cycle, CycleId, CycleStatus, CycleTask, GateCheck, HumanOverride, MetricCheck, MetricKind,
    Phase, PhaseMetrics, QualityGate, TaskMetrics,
};
pub use memory::{MemoryKey, MemoryOperation, MemoryUpdate, RecordKind, StoreTarget, SyncState};
pub use recursion::{
    EffectivenessRecord, ResourceLimits, TerminationDecision, TerminationEvaluator,
    TerminationProbe, TerminationReason, TerminationThresholds,
};
pub use wsde::{AgentId, AgentProfile, PrimusRotation, Role, RoleAssignment};
