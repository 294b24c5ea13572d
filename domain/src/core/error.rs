//! Domain error types

use crate::cycle::{CycleId, Phase};
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Phase ordering violation in cycle {cycle}: cannot move from {from} to {requested}")]
    OrderingViolation {
        cycle: CycleId,
        from: Phase,
        requested: Phase,
    },

    #[error("Cycle {0} has not been started")]
    NotStarted(CycleId),

    #[error("Cycle {0} has already been started")]
    AlreadyStarted(CycleId),

    #[error("Invalid task: {0}")]
    InvalidTask(String),
}

impl DomainError {
    /// Check if this error is a phase ordering violation
    pub fn is_ordering_violation(&self) -> bool {
        matches!(self, DomainError::OrderingViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_violation_display() {
        let error = DomainError::OrderingViolation {
            cycle: CycleId::new("c-1"),
            from: Phase::Expand,
            requested: Phase::Refine,
        };
        assert_eq!(
            error.to_string(),
            "Phase ordering violation in cycle c-1: cannot move from expand to refine"
        );
        assert!(error.is_ordering_violation());
    }

    #[test]
    fn test_other_errors_are_not_ordering_violations() {
        assert!(!DomainError::NotStarted(CycleId::new("c")).is_ordering_violation());
        assert!(!DomainError::InvalidTask("empty".to_string()).is_ordering_violation());
    }
}
