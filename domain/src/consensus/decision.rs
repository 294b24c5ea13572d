//! Decision entity and its resolution from votes.

use super::dialectic::DialecticalCritique;
use super::tally::Tally;
use super::vote::{Vote, VotingMethod};
use crate::core::time::now_millis;
use crate::cycle::Phase;
use crate::wsde::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why no decision could be made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsensusFailure {
    #[error("no options to decide between")]
    NoOptions,

    #[error("no agents available to vote")]
    NoAgents,

    #[error("no valid votes ({discarded} discarded)")]
    NoValidVotes { discarded: usize },

    #[error("tie epsilon must be finite and non-negative, got {epsilon}")]
    InvalidEpsilon { epsilon: f64 },

    #[error("vote from {agent} has invalid weight {weight}")]
    InvalidWeight { agent: AgentId, weight: f64 },
}

/// Combined proposal produced when the vote ends in a tie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisProposal {
    pub options: Vec<String>,
    pub contributors: Vec<AgentId>,
    pub content: String,
}

impl SynthesisProposal {
    fn build(tied: &[String], votes: &[Vote]) -> Self {
        let mut contributors = Vec::new();
        let mut lines = vec![format!("Combined proposal: {}", tied.join(" + "))];
        for vote in votes.iter().filter(|v| tied.contains(&v.option)) {
            if !contributors.contains(&vote.agent) {
                contributors.push(vote.agent.clone());
            }
            if !vote.rationale.is_empty() {
                lines.push(format!("- {} ({}): {}", vote.agent, vote.option, vote.rationale));
            }
        }
        Self {
            options: tied.to_vec(),
            contributors,
            content: lines.join("\n"),
        }
    }
}

/// What the decision settled on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Selected { option: String },
    Synthesized(SynthesisProposal),
}

/// A finalized team decision (immutable apart from an attached critique).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub topic: String,
    pub phase: Phase,
    pub options: Vec<String>,
    pub votes: Vec<Vote>,
    pub contributors: Vec<AgentId>,
    pub tallies: BTreeMap<String, f64>,
    pub method: VotingMethod,
    pub tie_break: bool,
    pub conflicting_options: Vec<String>,
    pub outcome: DecisionOutcome,
    pub rationale: String,
    pub critique: Option<DialecticalCritique>,
    /// Milliseconds since epoch
    pub timestamp: u64,
}

impl Decision {
    /// Resolve `votes` over `options`.
    ///
    /// Votes for options not on offer are discarded. The option with the
    /// highest weighted tally wins; when two or more options are within
    /// `epsilon` of the top tally, they are combined into a synthesis. Only
    /// options that received a vote can win or take part in a tie.
    pub fn resolve(
        topic: impl Into<String>,
        phase: Phase,
        options: Vec<String>,
        votes: Vec<Vote>,
        epsilon: f64,
    ) -> Result<Decision, ConsensusFailure> {
        if options.is_empty() {
            return Err(ConsensusFailure::NoOptions);
        }
        if votes.is_empty() {
            return Err(ConsensusFailure::NoAgents);
        }
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(ConsensusFailure::InvalidEpsilon { epsilon });
        }
        if let Some(vote) = votes
            .iter()
            .find(|v| !v.weight.is_finite() || v.weight < 0.0)
        {
            return Err(ConsensusFailure::InvalidWeight {
                agent: vote.agent.clone(),
                weight: vote.weight,
            });
        }

        let (tally, accepted) = Tally::count(&options, votes);
        if accepted.is_empty() {
            return Err(ConsensusFailure::NoValidVotes {
                discarded: tally.discarded.len(),
            });
        }

        let mut contributors: Vec<AgentId> = Vec::new();
        for vote in &accepted {
            if !contributors.contains(&vote.agent) {
                contributors.push(vote.agent.clone());
            }
        }

        let mut leaders: Vec<String> =
            tally.leaders(&options, epsilon).into_iter().cloned().collect();
        let total: f64 = tally.totals.values().sum();

        let (method, tie_break, conflicting_options, outcome, rationale) = if leaders.len() > 1 {
            let synthesis = SynthesisProposal::build(&leaders, &accepted);
            let rationale = format!(
                "Tie between {} at {:.2}; combined into a synthesis from {} contributor(s)",
                leaders.join(", "),
                tally.max().unwrap_or(0.0),
                synthesis.contributors.len()
            );
            (
                VotingMethod::ConsensusSynthesis,
                true,
                leaders,
                DecisionOutcome::Synthesized(synthesis),
                rationale,
            )
        } else {
            let Some(option) = leaders.pop() else {
                return Err(ConsensusFailure::NoValidVotes {
                    discarded: tally.discarded.len(),
                });
            };
            let method = if accepted.iter().all(Vote::is_unweighted) {
                VotingMethod::Majority
            } else {
                VotingMethod::Weighted
            };
            let rationale = format!(
                "'{}' selected with {:.2} of {:.2} votes ({})",
                option,
                tally.get(&option),
                total,
                method
            );
            (
                method,
                false,
                Vec::new(),
                DecisionOutcome::Selected { option },
                rationale,
            )
        };

        Ok(Decision {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.into(),
            phase,
            options,
            votes: accepted,
            contributors,
            tallies: tally.totals,
            method,
            tie_break,
            conflicting_options,
            outcome,
            rationale,
            critique: None,
            timestamp: now_millis(),
        })
    }

    pub fn with_critique(mut self, critique: DialecticalCritique) -> Self {
        self.critique = Some(critique);
        self
    }

    /// The selected option, or the synthesized proposal text.
    pub fn chosen(&self) -> &str {
        match &self.outcome {
            DecisionOutcome::Selected { option } => option,
            DecisionOutcome::Synthesized(synthesis) => &synthesis.content,
        }
    }

    pub fn selected_option(&self) -> Option<&str> {
        match &self.outcome {
            DecisionOutcome::Selected { option } => Some(option),
            DecisionOutcome::Synthesized(_) => None,
        }
    }

    pub fn is_synthesis(&self) -> bool {
        matches!(self.outcome, DecisionOutcome::Synthesized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_weighted_decision() {
        let votes = vec![
            Vote::new("x", "A", "").with_weight(3.0),
            Vote::new("y", "B", "").with_weight(2.0),
            Vote::new("z", "A", "").with_weight(1.0),
        ];
        let decision =
            Decision::resolve("approach", Phase::Differentiate, options(&["A", "B"]), votes, 1e-6)
                .unwrap();
        assert_eq!(decision.tallies["A"], 4.0);
        assert_eq!(decision.tallies["B"], 2.0);
        assert_eq!(decision.method, VotingMethod::Weighted);
        assert_eq!(decision.selected_option(), Some("A"));
        assert!(!decision.tie_break);
    }

    #[test]
    fn test_unweighted_decision_is_majority() {
        let votes = vec![
            Vote::new("x", "A", ""),
            Vote::new("y", "A", ""),
            Vote::new("z", "B", ""),
        ];
        let decision =
            Decision::resolve("t", Phase::Differentiate, options(&["A", "B"]), votes, 1e-6)
                .unwrap();
        assert_eq!(decision.method, VotingMethod::Majority);
        assert_eq!(decision.chosen(), "A");
    }

    #[test]
    fn test_tie_produces_synthesis() {
        let votes = vec![
            Vote::new("alice", "A", "simpler"),
            Vote::new("bob", "B", "faster"),
        ];
        let decision =
            Decision::resolve("t", Phase::Differentiate, options(&["A", "B"]), votes, 1e-6)
                .unwrap();
        assert_eq!(decision.method, VotingMethod::ConsensusSynthesis);
        assert!(decision.tie_break);
        assert_eq!(decision.conflicting_options, options(&["A", "B"]));
        assert_eq!(
            decision.contributors,
            vec![AgentId::new("alice"), AgentId::new("bob")]
        );
        match &decision.outcome {
            DecisionOutcome::Synthesized(s) => {
                assert_eq!(s.options, options(&["A", "B"]));
                assert!(s.content.contains("simpler"));
                assert!(s.content.contains("faster"));
            }
            other => panic!("expected synthesis, got {other:?}"),
        }
    }

    #[test]
    fn test_tallies_are_deterministic() {
        let votes = || {
            vec![
                Vote::new("x", "A", "").with_weight(0.5),
                Vote::new("y", "B", "").with_weight(1.5),
            ]
        };
        let a = Decision::resolve("t", Phase::Refine, options(&["A", "B"]), votes(), 1e-6).unwrap();
        let b = Decision::resolve("t", Phase::Refine, options(&["A", "B"]), votes(), 1e-6).unwrap();
        assert_eq!(a.tallies, b.tallies);
        assert_eq!(a.outcome, b.outcome);
    }

    #[test]
    fn test_failures() {
        assert_eq!(
            Decision::resolve("t", Phase::Expand, vec![], vec![Vote::new("x", "A", "")], 1e-6)
                .unwrap_err(),
            ConsensusFailure::NoOptions
        );
        assert_eq!(
            Decision::resolve("t", Phase::Expand, options(&["A"]), vec![], 1e-6).unwrap_err(),
            ConsensusFailure::NoAgents
        );
        assert_eq!(
            Decision::resolve(
                "t",
                Phase::Expand,
                options(&["A"]),
                vec![Vote::new("x", "Z", "")],
                1e-6
            )
            .unwrap_err(),
            ConsensusFailure::NoValidVotes { discarded: 1 }
        );
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let nan = Decision::resolve(
            "t",
            Phase::Differentiate,
            options(&["A"]),
            vec![Vote::new("x", "A", "").with_weight(f64::NAN)],
            1e-6,
        )
        .unwrap_err();
        assert!(matches!(nan, ConsensusFailure::InvalidWeight { ref agent, .. } if agent.as_str() == "x"));

        let negative = Decision::resolve(
            "t",
            Phase::Differentiate,
            options(&["A", "B"]),
            vec![Vote::new("x", "A", "").with_weight(-1.0)],
            1e-6,
        )
        .unwrap_err();
        assert_eq!(
            negative,
            ConsensusFailure::InvalidWeight {
                agent: AgentId::new("x"),
                weight: -1.0
            }
        );
    }

    #[test]
    fn test_invalid_epsilon_is_rejected() {
        for epsilon in [-1.0, f64::NAN, f64::INFINITY] {
            let err = Decision::resolve(
                "t",
                Phase::Differentiate,
                options(&["A"]),
                vec![Vote::new("x", "A", "")],
                epsilon,
            )
            .unwrap_err();
            assert!(matches!(err, ConsensusFailure::InvalidEpsilon { .. }), "{epsilon}");
        }
    }

    #[test]
    fn test_only_voted_options_can_win() {
        let decision = Decision::resolve(
            "t",
            Phase::Differentiate,
            options(&["A", "B"]),
            vec![Vote::new("x", "A", "").with_weight(0.0)],
            1e-6,
        )
        .unwrap();
        assert_eq!(decision.selected_option(), Some("A"));
        assert!(!decision.tie_break);
        assert_eq!(decision.tallies["B"], 0.0);
    }
}
