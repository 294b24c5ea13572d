//! `[recursion]` section

use edrr_application::{MAX_RECURSION_DEPTH, RecursionConfig};
use edrr_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecursionConfig {
    /// Deepest micro-cycle nesting; values above 10 are clamped
    pub max_depth: u32,
    /// Micro-cycles one phase of one cycle may open
    pub max_micro_cycles_per_phase: u32,
}

impl Default for FileRecursionConfig {
    fn default() -> Self {
        let defaults = RecursionConfig::default();
        Self {
            max_depth: defaults.max_depth(),
            max_micro_cycles_per_phase: defaults.max_micro_cycles_per_phase,
        }
    }
}

impl FileRecursionConfig {
    /// Convert to the application type, reporting a clamped depth.
    pub fn to_recursion_config(&self) -> (RecursionConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        if self.max_depth > MAX_RECURSION_DEPTH {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::RecursionDepthClamped,
                format!(
                    "recursion.max_depth: {} is above {MAX_RECURSION_DEPTH}, clamping",
                    self.max_depth
                ),
            ));
        }
        if self.max_micro_cycles_per_phase == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroLimit,
                "recursion.max_micro_cycles_per_phase: 0 disables micro-cycles",
            ));
        }
        let config = RecursionConfig::new(self.max_depth)
            .with_max_micro_cycles_per_phase(self.max_micro_cycles_per_phase);
        (config, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_above_ten_is_clamped_with_warning() {
        let file = FileRecursionConfig {
            max_depth: 42,
            ..Default::default()
        };
        let (config, issues) = file.to_recursion_config();
        assert_eq!(config.max_depth(), MAX_RECURSION_DEPTH);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::RecursionDepthClamped);
        assert!(!issues[0].is_error());
    }

    #[test]
    fn test_defaults_match_application() {
        let (config, issues) = FileRecursionConfig::default().to_recursion_config();
        assert_eq!(config, RecursionConfig::default());
        assert!(issues.is_empty());
    }
}
