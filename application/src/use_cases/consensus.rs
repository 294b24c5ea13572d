//! WSDE consensus engine.
//!
//! Runs the team side of a phase: primus rotation and role assignment,
//! concurrent proposal gathering, concurrent voting with a barrier before the
//! tally, and the optional dialectical critique. Finalized decisions are
//! queued for persistence and handed to the decision hooks.

use crate::config::ConsensusSettings;
use crate::ports::agent::Agent;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger};
use crate::ports::memory_manager::MemoryManager;
use crate::use_cases::hooks::HookRegistry;
use edrr_domain::{
    AgentProfile, Context, CycleTask, Decision, DialecticalCritique, MemoryKey, Phase,
    PrimusRotation, Proposal, RecordKind, RoleAssignment, Vote,
};
use serde_json::json;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub struct ConsensusEngine {
    agents: Vec<Arc<dyn Agent>>,
    settings: ConsensusSettings,
    rotation: Mutex<PrimusRotation>,
    memory: Arc<dyn MemoryManager>,
    audit: Arc<dyn AuditLogger>,
    hooks: HookRegistry<Decision>,
}

impl ConsensusEngine {
    pub fn new(
        agents: Vec<Arc<dyn Agent>>,
        settings: ConsensusSettings,
        memory: Arc<dyn MemoryManager>,
    ) -> Self {
        Self {
            agents,
            settings,
            rotation: Mutex::new(PrimusRotation::new()),
            memory,
            audit: Arc::new(NoAuditLogger),
            hooks: HookRegistry::new(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn profiles(&self) -> Vec<AgentProfile> {
        self.agents.iter().map(|a| a.profile()).collect()
    }

    /// Register a callback run for every finalized decision.
    pub fn register_decision_hook<F>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn(&Decision) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.register(name, hook);
    }

    /// Rotate the primus and fill the supporting roles for `phase`.
    ///
    /// Returns `None` when the team is empty.
    pub fn assign_roles(&self, task: &CycleTask, phase: Phase) -> Option<RoleAssignment> {
        let profiles = self.profiles();
        let primus = self
            .rotation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .select(&profiles, &task.search_text(), phase)?;

        let assignment = RoleAssignment::assign(phase, primus, &profiles);
        debug!(
            phase = %phase,
            primus = %assignment.primus,
            "Roles assigned"
        );
        Some(assignment)
    }

    /// Ask every agent for a proposal. Failed agents are skipped.
    ///
    /// Proposals come back in team order.
    pub async fn gather_proposals(&self, task: &CycleTask, context: &Context) -> Vec<Proposal> {
        let mut join_set = JoinSet::new();

        for (index, agent) in self.agents.iter().enumerate() {
            let agent = Arc::clone(agent);
            let task = task.clone();
            let context = context.clone();
            join_set.spawn(async move {
                let result = agent.propose(&task, &context).await;
                (index, agent.id().clone(), result)
            });
        }

        let mut proposals = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, _, Ok(proposal))) => proposals.push((index, proposal)),
                Ok((_, agent, Err(e))) => warn!("Agent {} failed to propose: {}", agent, e),
                Err(e) => warn!("Task join error: {}", e),
            }
        }

        proposals.sort_by_key(|(index, _)| *index);
        info!("Gathered {} proposal(s)", proposals.len());
        proposals.into_iter().map(|(_, p)| p).collect()
    }

    async fn collect_votes(&self, options: &[String], context: &Context) -> Vec<Vote> {
        let mut join_set = JoinSet::new();

        for (index, agent) in self.agents.iter().enumerate() {
            let agent = Arc::clone(agent);
            let options = options.to_vec();
            let context = context.clone();
            join_set.spawn(async move {
                let result = agent.vote(&options, &context).await;
                (index, agent.id().clone(), agent.weight(), result)
            });
        }

        // Barrier: every vote is in before anything is counted.
        let mut votes = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, agent, weight, Ok(vote))) => {
                    let vote = Vote {
                        agent,
                        ..vote.with_weight(weight)
                    };
                    votes.push((index, vote));
                }
                Ok((_, agent, _, Err(e))) => warn!("Agent {} failed to vote: {}", agent, e),
                Err(e) => warn!("Task join error: {}", e),
            }
        }

        votes.sort_by_key(|(index, _)| *index);
        votes.into_iter().map(|(_, v)| v).collect()
    }

    /// Vote on `options` and finalize the result.
    ///
    /// Returns `None` when no decision could be reached; the failure has been
    /// logged and audited.
    pub async fn decide(
        &self,
        topic: &str,
        phase: Phase,
        options: Vec<String>,
        context: &Context,
        roles: Option<&RoleAssignment>,
    ) -> Option<Decision> {
        info!(topic, phase = %phase, options = options.len(), "Voting");
        let votes = self.collect_votes(&options, context).await;

        for vote in votes.iter().filter(|v| !options.contains(&v.option)) {
            warn!(
                "Discarding vote from {} for unknown option '{}'",
                vote.agent, vote.option
            );
        }

        let mut decision = match Decision::resolve(topic, phase, options, votes, self.settings.epsilon)
        {
            Ok(decision) => decision,
            Err(failure) => {
                warn!(topic, "Consensus failed: {}", failure);
                self.audit.log(AuditEvent::new(
                    "consensus_failure",
                    json!({
                        "topic": topic,
                        "phase": phase.as_str(),
                        "error": failure.to_string(),
                    }),
                ));
                return None;
            }
        };

        if self.settings.critique
            && let Some(roles) = roles
        {
            let thesis = Proposal::new(
                roles.primus.clone(),
                decision.selected_option().unwrap_or("synthesis"),
                decision.chosen(),
            );
            if let Some(critique) = self.critique(roles, &thesis).await {
                decision = decision.with_critique(critique);
            }
        }

        info!(
            topic,
            method = decision.method.as_str(),
            tie_break = decision.tie_break,
            "Decision: {}",
            decision.rationale
        );
        self.finalize(&decision);
        Some(decision)
    }

    /// Have the critic role review `proposal`.
    ///
    /// The critic is the evaluator, else the supervisor. Returns `None` when
    /// neither role is held or the review failed.
    pub async fn critique(
        &self,
        roles: &RoleAssignment,
        proposal: &Proposal,
    ) -> Option<DialecticalCritique> {
        let critic_id = roles.critic()?;
        let critic = self.agents.iter().find(|a| a.id() == critic_id)?;

        match critic.review(proposal).await {
            Ok(review) => {
                debug!(critic = %critic_id, concerns = review.concerns.len(), "Critique received");
                Some(DialecticalCritique::from_review(
                    critic_id.clone(),
                    &proposal.content,
                    &review,
                ))
            }
            Err(e) => {
                warn!("Critic {} failed to review: {}", critic_id, e);
                None
            }
        }
    }

    fn finalize(&self, decision: &Decision) {
        let key = MemoryKey::in_phase(decision.phase, decision.topic.clone(), RecordKind::Decision);
        match serde_json::to_value(decision) {
            Ok(value) => self.memory.write(key, value),
            Err(e) => warn!("Failed to serialize decision {}: {}", decision.id, e),
        }

        self.hooks.emit(decision);
        self.audit.log(AuditEvent::new(
            "decision",
            json!({
                "id": decision.id,
                "topic": decision.topic,
                "phase": decision.phase.as_str(),
                "method": decision.method.as_str(),
                "chosen": decision.chosen(),
                "tie_break": decision.tie_break,
                "conflicting_options": decision.conflicting_options,
                "contributors": decision.contributors,
                "tallies": decision.tallies,
            }),
        ));
    }
}
