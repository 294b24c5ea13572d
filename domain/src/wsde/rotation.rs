//! Primus rotation.
//!
//! The primus is the best-scoring agent among those that have not led yet in
//! the current rotation. Once every agent has served, the rotation starts
//! over.

use super::roles::{AgentId, AgentProfile, expertise_score};
use crate::cycle::Phase;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct PrimusRotation {
    served: BTreeSet<AgentId>,
}

impl PrimusRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the primus for `phase` and mark them as having served.
    ///
    /// Ties go to the agent listed first. Returns `None` for an empty team.
    pub fn select(
        &mut self,
        profiles: &[AgentProfile],
        task_text: &str,
        phase: Phase,
    ) -> Option<AgentId> {
        if profiles.is_empty() {
            return None;
        }
        if profiles.iter().all(|p| self.served.contains(&p.id)) {
            self.served.clear();
        }

        let mut best: Option<(&AgentProfile, usize)> = None;
        for profile in profiles.iter().filter(|p| !self.served.contains(&p.id)) {
            let score = expertise_score(profile, task_text, phase);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((profile, score));
            }
        }

        let (chosen, _) = best?;
        self.served.insert(chosen.id.clone());
        Some(chosen.id.clone())
    }

    pub fn has_served(&self, agent: &AgentId) -> bool {
        self.served.contains(agent)
    }

    pub fn reset(&mut self) {
        self.served.clear();
    }
}
