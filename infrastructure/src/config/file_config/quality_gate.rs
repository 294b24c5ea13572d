//! `[quality_gate]` section
//!
//! ```toml
//! [quality_gate]
//! enabled = true
//!
//! [quality_gate.refine]
//! quality = 0.6
//! conflicts = 2
//! ```
//!
//! Unset metrics keep the standard thresholds.

use edrr_domain::{ConfigIssue, ConfigIssueCode, MetricKind, Phase, QualityGate};
use serde::{Deserialize, Serialize};

/// Threshold overrides for one phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePhaseThresholds {
    pub quality: Option<f64>,
    pub completeness: Option<f64>,
    pub consistency: Option<f64>,
    pub coverage: Option<f64>,
    /// Most unresolved conflicts allowed
    pub conflicts: Option<f64>,
}

impl FilePhaseThresholds {
    fn overrides(&self) -> [(MetricKind, Option<f64>); 5] {
        [
            (MetricKind::Quality, self.quality),
            (MetricKind::Completeness, self.completeness),
            (MetricKind::Consistency, self.consistency),
            (MetricKind::Coverage, self.coverage),
            (MetricKind::Conflicts, self.conflicts),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQualityGateConfig {
    /// Check phase metrics before each transition
    pub enabled: bool,
    pub expand: FilePhaseThresholds,
    pub differentiate: FilePhaseThresholds,
    pub refine: FilePhaseThresholds,
    pub retrospect: FilePhaseThresholds,
}

impl FileQualityGateConfig {
    /// `None` when the gate is disabled. Invalid overrides are reported and
    /// the standard threshold is kept.
    pub fn to_quality_gate(&self) -> (Option<QualityGate>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut gate = QualityGate::standard();

        let phases = [
            (Phase::Expand, &self.expand),
            (Phase::Differentiate, &self.differentiate),
            (Phase::Refine, &self.refine),
            (Phase::Retrospect, &self.retrospect),
        ];
        for (phase, thresholds) in phases {
            for (metric, value) in thresholds.overrides() {
                let Some(value) = value else { continue };
                let valid = if metric.is_ceiling() {
                    value.is_finite() && value >= 0.0
                } else {
                    (0.0..=1.0).contains(&value)
                };
                if valid {
                    gate = gate.with_threshold(phase, metric, value);
                } else {
                    let expected = if metric.is_ceiling() {
                        "a non-negative count"
                    } else {
                        "within [0, 1]"
                    };
                    issues.push(ConfigIssue::warning(
                        ConfigIssueCode::ThresholdOutOfRange,
                        format!("quality_gate.{phase}.{metric}: {value} must be {expected}"),
                    ));
                }
            }
        }

        (self.enabled.then_some(gate), issues)
    }
}
