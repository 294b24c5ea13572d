//! Agent port
//!
//! A WSDE team member. Implementations may call an LLM, a human or a
//! deterministic rule set; the consensus engine only sees this trait.

use async_trait::async_trait;
use edrr_domain::{AgentId, AgentProfile, Context, CycleTask, Critique, Proposal, Vote};
use thiserror::Error;

/// Errors that can occur while asking an agent for work
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Agent {0} is unavailable")]
    Unavailable(String),

    #[error("Agent {agent} returned an invalid response: {reason}")]
    InvalidResponse { agent: String, reason: String },

    #[error("Agent {0} timed out")]
    Timeout(String),
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &AgentId;

    /// Lowercase expertise keywords.
    fn expertise(&self) -> &[String];

    /// Voting weight; 1.0 unless the agent carries extra expertise weight.
    fn weight(&self) -> f64 {
        1.0
    }

    fn profile(&self) -> AgentProfile {
        AgentProfile::new(self.id().clone())
            .with_expertise(self.expertise().iter().cloned())
            .with_weight(self.weight())
    }

    /// Put forward a candidate approach for `task`.
    async fn propose(&self, task: &CycleTask, context: &Context) -> Result<Proposal, AgentError>;

    /// Critique a proposal.
    async fn review(&self, proposal: &Proposal) -> Result<Critique, AgentError>;

    /// Vote for one of `options`.
    async fn vote(&self, options: &[String], context: &Context) -> Result<Vote, AgentError>;
}
