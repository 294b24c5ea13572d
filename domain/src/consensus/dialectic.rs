//! Proposals and dialectical critique.

use crate::wsde::AgentId;
use serde::{Deserialize, Serialize};

/// A candidate approach put forward by an agent during expand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub agent: AgentId,
    /// Short label used as the option in votes.
    pub option: String,
    pub content: String,
}

impl Proposal {
    pub fn new(
        agent: impl Into<AgentId>,
        option: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            agent: agent.into(),
            option: option.into(),
            content: content.into(),
        }
    }
}

/// An agent's review of a proposal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Critique {
    /// Weaknesses found in the proposal.
    pub concerns: Vec<String>,
    /// The reviewer's improved version, if they wrote one.
    pub revision: Option<String>,
}

impl Critique {
    pub fn new<I, S>(concerns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            concerns: concerns.into_iter().map(Into::into).collect(),
            revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

/// Thesis / antithesis / synthesis record attached to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialecticalCritique {
    pub critic: AgentId,
    pub thesis: String,
    pub antithesis: String,
    pub synthesis: String,
}

impl DialecticalCritique {
    pub fn from_review(critic: AgentId, thesis: &str, critique: &Critique) -> Self {
        let antithesis = if critique.concerns.is_empty() {
            "No concerns raised".to_string()
        } else {
            critique.concerns.join("; ")
        };

        let synthesis = match &critique.revision {
            Some(revision) => revision.clone(),
            None if critique.concerns.is_empty() => thesis.to_string(),
            None => format!("{thesis} (addressing: {antithesis})"),
        };

        Self {
            critic,
            thesis: thesis.to_string(),
            antithesis,
            synthesis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_review_with_concerns() {
        let critique = Critique::new(["no error handling", "slow"]);
        let d = DialecticalCritique::from_review("bob".into(), "use a regex", &critique);
        assert_eq!(d.thesis, "use a regex");
        assert_eq!(d.antithesis, "no error handling; slow");
        assert_eq!(d.synthesis, "use a regex (addressing: no error handling; slow)");
    }

    #[test]
    fn test_revision_becomes_synthesis() {
        let critique = Critique::new(["slow"]).with_revision("use a hand-written lexer");
        let d = DialecticalCritique::from_review("bob".into(), "use a regex", &critique);
        assert_eq!(d.synthesis, "use a hand-written lexer");
    }

    #[test]
    fn test_no_concerns_keeps_thesis() {
        let d = DialecticalCritique::from_review("bob".into(), "ship it", &Critique::default());
        assert_eq!(d.antithesis, "No concerns raised");
        assert_eq!(d.synthesis, "ship it");
    }
}
