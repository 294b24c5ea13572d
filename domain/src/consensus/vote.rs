//! Vote types for WSDE decisions

use crate::wsde::AgentId;
use serde::{Deserialize, Serialize};

/// A single agent's vote on a decision
///
/// # Example
///
/// ```
/// use edrr_domain::consensus::Vote;
///
/// let vote = Vote::new("alice", "option-a", "Fits the existing parser").with_weight(2.0);
/// assert_eq!(vote.option, "option-a");
/// assert!(!vote.is_unweighted());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub agent: AgentId,
    /// The chosen option, one of the decision's offered options
    pub option: String,
    /// Expertise weight (defaults to 1.0)
    pub weight: f64,
    pub rationale: String,
}

impl Vote {
    pub fn new(
        agent: impl Into<AgentId>,
        option: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            agent: agent.into(),
            option: option.into(),
            weight: 1.0,
            rationale: rationale.into(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn is_unweighted(&self) -> bool {
        self.weight == 1.0
    }
}

/// How a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingMethod {
    /// Every vote weighed 1.0
    Majority,
    /// At least one vote carried an expertise weight
    Weighted,
    /// Tie resolved by combining the tied options
    ConsensusSynthesis,
}

impl VotingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VotingMethod::Majority => "majority",
            VotingMethod::Weighted => "weighted",
            VotingMethod::ConsensusSynthesis => "consensus_synthesis",
        }
    }
}

impl std::fmt::Display for VotingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weight() {
        let vote = Vote::new("alice", "a", "because");
        assert_eq!(vote.weight, 1.0);
        assert!(vote.is_unweighted());
        assert_eq!(vote.agent.as_str(), "alice");
    }

    #[test]
    fn test_method_serialization() {
        let json = serde_json::to_string(&VotingMethod::ConsensusSynthesis).unwrap();
        assert_eq!(json, "\"consensus_synthesis\"");
        assert_eq!(VotingMethod::Weighted.to_string(), "weighted");
    }
}
