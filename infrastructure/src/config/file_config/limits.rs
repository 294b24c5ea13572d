//! `[limits]` section

use edrr_domain::{ConfigIssue, ConfigIssueCode, ResourceLimits};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLimitsConfig {
    /// Wall-clock budget of a whole run
    pub time_limit_secs: u64,
    /// Estimated context memory budget
    pub memory_limit_mib: u64,
    /// Fraction of a limit at which spawning stops early
    pub soft_limit_ratio: f64,
}

impl Default for FileLimitsConfig {
    fn default() -> Self {
        let defaults = ResourceLimits::default();
        Self {
            time_limit_secs: defaults.time_limit.as_secs(),
            memory_limit_mib: defaults.memory_limit / MIB,
            soft_limit_ratio: defaults.soft_limit_ratio,
        }
    }
}

impl FileLimitsConfig {
    pub fn to_resource_limits(&self) -> (ResourceLimits, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        if self.time_limit_secs == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroLimit,
                "limits.time_limit_secs: 0 declines every micro-cycle",
            ));
        }
        if self.memory_limit_mib == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::ZeroLimit,
                "limits.memory_limit_mib: 0 declines every micro-cycle",
            ));
        }

        let mut soft_limit_ratio = self.soft_limit_ratio;
        if !(soft_limit_ratio > 0.0 && soft_limit_ratio <= 1.0) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::SoftLimitRatioOutOfRange,
                format!("limits.soft_limit_ratio: {soft_limit_ratio} is outside (0, 1]"),
            ));
            soft_limit_ratio = ResourceLimits::default().soft_limit_ratio;
        }

        let limits = ResourceLimits {
            time_limit: Duration::from_secs(self.time_limit_secs),
            memory_limit: self.memory_limit_mib.saturating_mul(MIB),
            soft_limit_ratio,
        };
        (limits, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_to_domain() {
        let (limits, issues) = FileLimitsConfig::default().to_resource_limits();
        assert_eq!(limits, ResourceLimits::default());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_bad_soft_ratio_is_an_error_and_falls_back() {
        let file = FileLimitsConfig {
            soft_limit_ratio: 1.5,
            ..Default::default()
        };
        let (limits, issues) = file.to_resource_limits();
        assert_eq!(limits.soft_limit_ratio, 0.9);
        assert!(issues[0].is_error());
        assert_eq!(issues[0].code, ConfigIssueCode::SoftLimitRatioOutOfRange);
    }

    #[test]
    fn test_zero_limits_warn() {
        let file = FileLimitsConfig {
            time_limit_secs: 0,
            memory_limit_mib: 0,
            ..Default::default()
        };
        let (_, issues) = file.to_resource_limits();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.code == ConfigIssueCode::ZeroLimit));
    }
}
