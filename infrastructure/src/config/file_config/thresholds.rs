//! `[thresholds]` section
//!
//! Deserialized straight into the domain [`TerminationThresholds`]; this module
//! only adds the range checks.

use edrr_domain::{ConfigIssue, ConfigIssueCode, TerminationThresholds};

/// Report scores outside `[0, 1]` and a negative cost/benefit ratio.
pub fn validate_thresholds(thresholds: &TerminationThresholds) -> Vec<ConfigIssue> {
    let scores = [
        ("granularity", thresholds.granularity),
        ("quality", thresholds.quality),
        ("resource_limit", thresholds.resource_limit),
        ("complexity", thresholds.complexity),
        ("convergence", thresholds.convergence),
        ("diminishing_returns", thresholds.diminishing_returns),
        ("historical_effectiveness", thresholds.historical_effectiveness),
    ];

    let mut issues: Vec<ConfigIssue> = scores
        .into_iter()
        .filter(|(_, value)| !(0.0..=1.0).contains(value))
        .map(|(name, value)| {
            ConfigIssue::warning(
                ConfigIssueCode::ThresholdOutOfRange,
                format!("thresholds.{name}: {value} is outside [0, 1]"),
            )
        })
        .collect();

    if thresholds.cost_benefit_ratio < 0.0 {
        issues.push(ConfigIssue::warning(
            ConfigIssueCode::ThresholdOutOfRange,
            format!(
                "thresholds.cost_benefit_ratio: {} is negative",
                thresholds.cost_benefit_ratio
            ),
        ));
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_thresholds(&TerminationThresholds::default()).is_empty());
    }

    #[test]
    fn test_out_of_range_scores() {
        let thresholds = TerminationThresholds {
            quality: 1.5,
            granularity: -0.1,
            cost_benefit_ratio: -2.0,
            ..Default::default()
        };
        let issues = validate_thresholds(&thresholds);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.code == ConfigIssueCode::ThresholdOutOfRange));
        assert!(issues[0].message.contains("granularity"));
    }
}
