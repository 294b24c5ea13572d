//! WSDE roles and expertise scoring.
//!
//! # Identifiers
//! - [`AgentId`] - Stable name of a participating agent
//!
//! # Team structure
//! - [`Role`] - Primus, Worker, Supervisor, Designer, Evaluator
//! - [`AgentProfile`] - Expertise keywords and voting weight of an agent
//! - [`RoleAssignment`] - Who holds which role for one phase

use crate::cycle::Phase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable identifier of an agent in the team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T: Into<String>> From<T> for AgentId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A WSDE team role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Task-selected lead, rotated between phases
    Primus,
    Worker,
    Supervisor,
    Designer,
    Evaluator,
}

impl Role {
    /// Roles filled after the primus, in assignment order.
    pub const SUPPORTING: [Role; 4] = [
        Role::Worker,
        Role::Supervisor,
        Role::Designer,
        Role::Evaluator,
    ];

    /// Expertise keywords that qualify an agent for this role.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Role::Primus => &["leadership", "coordination", "decision-making", "strategy"],
            Role::Worker => &["implementation", "coding", "development", "execution"],
            Role::Supervisor => &["oversight", "quality control", "review", "monitoring"],
            Role::Designer => &["design", "architecture", "planning", "creativity"],
            Role::Evaluator => &["testing", "evaluation", "assessment", "analysis"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primus => "primus",
            Role::Worker => "worker",
            Role::Supervisor => "supervisor",
            Role::Designer => "designer",
            Role::Evaluator => "evaluator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keywords describing expertise that is valuable in a phase.
pub fn phase_keywords(phase: Phase) -> &'static [&'static str] {
    match phase {
        Phase::Expand => &[
            "exploration",
            "brainstorming",
            "research",
            "discovery",
            "creativity",
            "innovation",
            "alternatives",
        ],
        Phase::Differentiate => &[
            "analysis",
            "comparison",
            "classification",
            "evaluation",
            "assessment",
            "critical thinking",
            "judgment",
        ],
        Phase::Refine => &[
            "refinement",
            "improvement",
            "optimization",
            "editing",
            "revision",
            "precision",
            "quality control",
        ],
        Phase::Retrospect => &[
            "reflection",
            "retrospective",
            "review",
            "learning",
            "insight",
            "assessment",
        ],
        Phase::Completed => &[],
    }
}

/// Static description of a team member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: AgentId,
    /// Lowercase expertise keywords.
    pub expertise: Vec<String>,
    /// Voting weight (1.0 means an ordinary, unweighted vote).
    pub weight: f64,
}

impl AgentProfile {
    pub fn new(id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            expertise: Vec::new(),
            weight: 1.0,
        }
    }

    pub fn with_expertise<I, S>(mut self, expertise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise = expertise
            .into_iter()
            .map(|e| e.into().to_lowercase())
            .collect();
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    fn matches(&self, keyword: &str) -> bool {
        self.expertise
            .iter()
            .any(|e| !e.is_empty() && (e.contains(keyword) || keyword.contains(e.as_str())))
    }

    /// Number of the role's keywords this agent's expertise covers.
    pub fn role_score(&self, role: Role) -> usize {
        role.keywords().iter().filter(|k| self.matches(k)).count()
    }
}

/// Task-fit score of an agent for a phase.
///
/// Counts expertise keywords that occur in `task_text` and adds the matches
/// against the phase keywords at double weight.
pub fn expertise_score(profile: &AgentProfile, task_text: &str, phase: Phase) -> usize {
    let text = task_text.to_lowercase();
    let base = profile
        .expertise
        .iter()
        .filter(|e| !e.is_empty() && text.contains(e.as_str()))
        .count();
    let phase_matches = phase_keywords(phase)
        .iter()
        .filter(|k| profile.matches(k))
        .count();
    base + 2 * phase_matches
}

/// Role holders for one phase of one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub phase: Phase,
    pub primus: AgentId,
    pub roles: BTreeMap<AgentId, Role>,
}

impl RoleAssignment {
    /// Fill the supporting roles around an already selected primus.
    ///
    /// Each supporting role goes to the unassigned agent with the most
    /// matching role keywords (earliest agent on ties). Agents left over
    /// after every role is filled become workers.
    pub fn assign(phase: Phase, primus: AgentId, profiles: &[AgentProfile]) -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(primus.clone(), Role::Primus);

        for role in Role::SUPPORTING {
            let best = profiles
                .iter()
                .filter(|p| !roles.contains_key(&p.id))
                .fold(None::<&AgentProfile>, |best, candidate| match best {
                    Some(current) if current.role_score(role) >= candidate.role_score(role) => {
                        Some(current)
                    }
                    _ => Some(candidate),
                });
            if let Some(profile) = best {
                roles.insert(profile.id.clone(), role);
            }
        }

        for profile in profiles {
            roles.entry(profile.id.clone()).or_insert(Role::Worker);
        }

        Self {
            phase,
            primus,
            roles,
        }
    }

    pub fn role_of(&self, agent: &AgentId) -> Option<Role> {
        self.roles.get(agent).copied()
    }

    pub fn holder(&self, role: Role) -> Option<&AgentId> {
        self.roles
            .iter()
            .find(|(_, r)| **r == role)
            .map(|(agent, _)| agent)
    }

    /// Agent responsible for critique: the evaluator, else the supervisor.
    pub fn critic(&self) -> Option<&AgentId> {
        self.holder(Role::Evaluator)
            .or_else(|| self.holder(Role::Supervisor))
    }
}
