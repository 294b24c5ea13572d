//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod consensus;
mod limits;
mod logging;
mod output;
mod quality_gate;
mod recursion;
mod thresholds;

pub use consensus::{FileAgentEntry, FileConsensusConfig, validate_agents};
pub use limits::FileLimitsConfig;
pub use logging::FileLoggingConfig;
pub use output::FileOutputConfig;
pub use quality_gate::{FilePhaseThresholds, FileQualityGateConfig};
pub use recursion::FileRecursionConfig;
pub use thresholds::validate_thresholds;

use edrr_application::EdrrConfig;
use edrr_domain::{ConfigIssue, TerminationThresholds};
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Recursion depth and spawn budget
    pub recursion: FileRecursionConfig,
    /// Termination heuristic thresholds (domain type)
    pub thresholds: TerminationThresholds,
    /// Hard time and memory limits
    pub limits: FileLimitsConfig,
    /// Voting settings
    pub consensus: FileConsensusConfig,
    /// Per-phase metric thresholds checked before each transition
    pub quality_gate: FileQualityGateConfig,
    /// The agent team
    pub agents: Vec<FileAgentEntry>,
    /// Audit trail settings
    pub logging: FileLoggingConfig,
    /// Report output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        self.to_edrr_config().1
    }

    /// Build the coordinator configuration. Out-of-range values are clamped
    /// or replaced by defaults and reported alongside.
    pub fn to_edrr_config(&self) -> (EdrrConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        let (recursion, recursion_issues) = self.recursion.to_recursion_config();
        issues.extend(recursion_issues);
        issues.extend(validate_thresholds(&self.thresholds));
        let (limits, limit_issues) = self.limits.to_resource_limits();
        issues.extend(limit_issues);
        let (consensus, consensus_issues) = self.consensus.to_settings();
        issues.extend(consensus_issues);
        let (quality_gate, gate_issues) = self.quality_gate.to_quality_gate();
        issues.extend(gate_issues);
        issues.extend(validate_agents(&self.agents));

        let mut config = EdrrConfig::default()
            .with_recursion(recursion)
            .with_thresholds(self.thresholds.clone())
            .with_limits(limits)
            .with_consensus(consensus);
        if let Some(gate) = quality_gate {
            config = config.with_quality_gate(gate);
        }
        (config, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edrr_domain::{ConfigIssueCode, MetricKind, OutputFormat, Phase};
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[recursion]
max_depth = 2
max_micro_cycles_per_phase = 4

[thresholds]
quality = 0.8
moderate_factor_count = 2

[limits]
time_limit_secs = 60
memory_limit_mib = 16

[consensus]
epsilon = 0.01
critique = false

[quality_gate]
enabled = true

[quality_gate.retrospect]
completeness = 0.9

[[agents]]
name = "architect"
expertise = ["design", "architecture"]
weight = 2.0

[[agents]]
name = "tester"
expertise = ["test"]

[logging]
audit_log = "audit.jsonl"

[output]
format = "json"
"#;

        let file: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(file.agents.len(), 2);
        assert_eq!(file.agents[1].weight, 1.0);
        assert_eq!(file.output.format, Some(OutputFormat::Json));
        assert_eq!(
            file.logging.audit_log.as_deref(),
            Some(std::path::Path::new("audit.jsonl"))
        );

        let (config, issues) = file.to_edrr_config();
        assert!(issues.is_empty());
        assert_eq!(config.recursion.max_depth(), 2);
        assert_eq!(config.recursion.max_micro_cycles_per_phase, 4);
        assert_eq!(config.thresholds.quality, 0.8);
        assert_eq!(config.thresholds.moderate_factor_count, 2);
        assert_eq!(config.thresholds.granularity, 0.2);
        assert_eq!(config.limits.time_limit, Duration::from_secs(60));
        assert_eq!(config.limits.memory_limit, 16 * 1024 * 1024);
        assert_eq!(config.consensus.epsilon, 0.01);
        assert!(!config.consensus.critique);
        let gate = config.quality_gate.unwrap();
        assert_eq!(
            gate.thresholds(Phase::Retrospect).unwrap()[&MetricKind::Completeness],
            0.9
        );
    }

    #[test]
    fn test_deserialize_partial_config() {
        let file: FileConfig = toml::from_str("[recursion]\nmax_depth = 5\n").unwrap();
        assert_eq!(file.recursion.max_depth, 5);
        assert_eq!(file.recursion.max_micro_cycles_per_phase, 3);
        assert!(file.agents.is_empty());
        assert!(file.output.color);
        assert!(file.to_edrr_config().0.quality_gate.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(FileConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_collects_every_section() {
        let toml_str = r#"
[recursion]
max_depth = 12

[thresholds]
quality = 2.0

[consensus]
epsilon = -1.0

[quality_gate.refine]
coverage = 3.0

[[agents]]
name = ""
"#;
        let file: FileConfig = toml::from_str(toml_str).unwrap();
        let codes: Vec<_> = file.validate().into_iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                ConfigIssueCode::RecursionDepthClamped,
                ConfigIssueCode::ThresholdOutOfRange,
                ConfigIssueCode::NegativeEpsilon,
                ConfigIssueCode::ThresholdOutOfRange,
                ConfigIssueCode::UnnamedAgent,
            ]
        );
        assert_eq!(file.to_edrr_config().0.recursion.max_depth(), 10);
    }
}
