//! Recursion domain
//!
//! Bounding of nested micro-cycles: the termination heuristics consulted at
//! every spawn attempt and the variant that guarantees a run terminates.

pub mod termination;
pub mod variant;

pub use termination::{
    Criterion, EffectivenessRecord, ResourceLimits, TerminationDecision, TerminationEvaluator,
    TerminationProbe, TerminationReason, TerminationThresholds, Verdict,
};
pub use variant::{phi, step_bound};
