//! `[consensus]` and `[[agents]]` sections

use edrr_application::ConsensusSettings;
use edrr_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConsensusConfig {
    /// Tallies within this distance of the maximum are a tie
    pub epsilon: f64,
    /// Ask the critic for a dialectical critique of the chosen option
    pub critique: bool,
}

impl Default for FileConsensusConfig {
    fn default() -> Self {
        let defaults = ConsensusSettings::default();
        Self {
            epsilon: defaults.epsilon,
            critique: defaults.critique,
        }
    }
}

impl FileConsensusConfig {
    /// A negative or non-finite epsilon is reported and treated as zero.
    pub fn to_settings(&self) -> (ConsensusSettings, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let valid = self.epsilon.is_finite() && self.epsilon >= 0.0;
        if !valid {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::NegativeEpsilon,
                format!(
                    "consensus.epsilon: {} must be a finite, non-negative number",
                    self.epsilon
                ),
            ));
        }
        let settings = ConsensusSettings {
            epsilon: if valid { self.epsilon } else { 0.0 },
            critique: self.critique,
        };
        (settings, issues)
    }
}

/// One `[[agents]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentEntry {
    pub name: String,
    /// Keywords matched against task text and phase keywords
    pub expertise: Vec<String>,
    /// Vote weight
    pub weight: f64,
}

impl Default for FileAgentEntry {
    fn default() -> Self {
        Self {
            name: String::new(),
            expertise: Vec::new(),
            weight: 1.0,
        }
    }
}

pub fn validate_agents(agents: &[FileAgentEntry]) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for (index, agent) in agents.iter().enumerate() {
        let name = agent.name.trim();
        if name.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::UnnamedAgent,
                format!("agents[{index}]: name is empty"),
            ));
        } else if !seen.insert(name) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::DuplicateAgent,
                format!("agents[{index}]: '{name}' is defined more than once"),
            ));
        }
        if !(agent.weight.is_finite() && agent.weight > 0.0) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::NonPositiveWeight,
                format!("agents[{index}]: weight {} must be a positive number", agent.weight),
            ));
        }
    }
    issues
}
