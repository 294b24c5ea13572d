//! Quality gate for phase transitions.
//!
//! Each working phase has per-metric thresholds. Scores (quality,
//! completeness, consistency, coverage) must reach their threshold; the
//! conflict count must not exceed its ceiling. A metric the phase did not
//! report fails the gate.

use super::entities::Phase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A metric a phase reports about its own result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Quality,
    Completeness,
    Consistency,
    Coverage,
    /// Unresolved conflicts; an upper bound rather than a minimum
    Conflicts,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Quality => "quality",
            MetricKind::Completeness => "completeness",
            MetricKind::Consistency => "consistency",
            MetricKind::Coverage => "coverage",
            MetricKind::Conflicts => "conflicts",
        }
    }

    /// Whether the threshold is a ceiling instead of a floor.
    pub fn is_ceiling(&self) -> bool {
        matches!(self, MetricKind::Conflicts)
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metric values reported by one phase execution.
pub type PhaseMetrics = BTreeMap<MetricKind, f64>;

/// Result of comparing one metric with its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricCheck {
    Met { value: f64, threshold: f64 },
    Below { value: f64, threshold: f64 },
    TooMany { value: f64, threshold: f64 },
    Missing { threshold: f64 },
}

impl MetricCheck {
    pub fn is_met(&self) -> bool {
        matches!(self, MetricCheck::Met { .. })
    }
}

impl std::fmt::Display for MetricCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricCheck::Met { value, threshold } => write!(f, "{value} meets {threshold}"),
            MetricCheck::Below { value, threshold } => write!(f, "{value} < {threshold}"),
            MetricCheck::TooMany { value, threshold } => write!(f, "{value} > {threshold}"),
            MetricCheck::Missing { .. } => write!(f, "missing"),
        }
    }
}

/// Outcome of a gate check for one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCheck {
    pub phase: Phase,
    pub passed: bool,
    pub checks: BTreeMap<MetricKind, MetricCheck>,
}

impl GateCheck {
    /// Metrics that kept the gate closed.
    pub fn failing(&self) -> impl Iterator<Item = (&MetricKind, &MetricCheck)> {
        self.checks.iter().filter(|(_, check)| !check.is_met())
    }
}

/// Per-phase metric thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    thresholds: BTreeMap<Phase, BTreeMap<MetricKind, f64>>,
}

impl QualityGate {
    const MEDIUM: f64 = 0.5;
    const HIGH: f64 = 0.7;
    const VERY_HIGH: f64 = 0.85;

    /// Thresholds that tighten from Expand to Retrospect.
    pub fn standard() -> Self {
        use MetricKind::*;

        let table = [
            (
                Phase::Expand,
                vec![
                    (Quality, Self::MEDIUM),
                    (Completeness, Self::MEDIUM),
                    (Consistency, Self::MEDIUM),
                    (Conflicts, 3.0),
                ],
            ),
            (
                Phase::Differentiate,
                vec![
                    (Quality, Self::MEDIUM),
                    (Completeness, Self::MEDIUM),
                    (Consistency, Self::HIGH),
                    (Conflicts, 2.0),
                ],
            ),
            (
                Phase::Refine,
                vec![
                    (Quality, Self::HIGH),
                    (Completeness, Self::HIGH),
                    (Consistency, Self::HIGH),
                    (Coverage, Self::MEDIUM),
                    (Conflicts, 1.0),
                ],
            ),
            (
                Phase::Retrospect,
                vec![
                    (Quality, Self::HIGH),
                    (Completeness, Self::VERY_HIGH),
                    (Consistency, Self::VERY_HIGH),
                    (Conflicts, 0.0),
                ],
            ),
        ];

        Self {
            thresholds: table
                .into_iter()
                .map(|(phase, metrics)| (phase, metrics.into_iter().collect()))
                .collect(),
        }
    }

    pub fn with_threshold(mut self, phase: Phase, metric: MetricKind, threshold: f64) -> Self {
        self.thresholds.entry(phase).or_default().insert(metric, threshold);
        self
    }

    pub fn thresholds(&self, phase: Phase) -> Option<&BTreeMap<MetricKind, f64>> {
        self.thresholds.get(&phase)
    }

    /// Compare `metrics` with the thresholds of `phase`.
    ///
    /// A phase without thresholds always passes.
    pub fn check(&self, phase: Phase, metrics: &PhaseMetrics) -> GateCheck {
        let mut checks = BTreeMap::new();
        for (metric, &threshold) in self.thresholds.get(&phase).into_iter().flatten() {
            let check = match metrics.get(metric).copied() {
                None => MetricCheck::Missing { threshold },
                Some(value) if value.is_nan() => MetricCheck::Missing { threshold },
                Some(value) if metric.is_ceiling() && value > threshold => {
                    MetricCheck::TooMany { value, threshold }
                }
                Some(value) if !metric.is_ceiling() && value < threshold => {
                    MetricCheck::Below { value, threshold }
                }
                Some(value) => MetricCheck::Met { value, threshold },
            };
            checks.insert(*metric, check);
        }

        GateCheck {
            phase,
            passed: checks.values().all(MetricCheck::is_met),
            checks,
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(values: &[(MetricKind, f64)]) -> PhaseMetrics {
        values.iter().copied().collect()
    }

    #[test]
    fn test_expand_passes_with_medium_scores() {
        let gate = QualityGate::standard();
        let check = gate.check(
            Phase::Expand,
            &metrics(&[
                (MetricKind::Quality, 0.5),
                (MetricKind::Completeness, 0.6),
                (MetricKind::Consistency, 0.9),
                (MetricKind::Conflicts, 3.0),
            ]),
        );
        assert!(check.passed);
        assert_eq!(check.failing().count(), 0);
    }

    #[test]
    fn test_failing_metrics_are_reported() {
        let gate = QualityGate::standard();
        let check = gate.check(
            Phase::Retrospect,
            &metrics(&[
                (MetricKind::Quality, 0.9),
                (MetricKind::Completeness, 0.5),
                (MetricKind::Conflicts, 1.0),
            ]),
        );
        assert!(!check.passed);
        let failing: Vec<_> = check.failing().map(|(m, c)| (*m, *c)).collect();
        assert_eq!(
            failing,
            vec![
                (
                    MetricKind::Completeness,
                    MetricCheck::Below {
                        value: 0.5,
                        threshold: 0.85
                    }
                ),
                (MetricKind::Consistency, MetricCheck::Missing { threshold: 0.85 }),
                (
                    MetricKind::Conflicts,
                    MetricCheck::TooMany {
                        value: 1.0,
                        threshold: 0.0
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_override_and_unconfigured_phase() {
        let gate = QualityGate::standard().with_threshold(Phase::Refine, MetricKind::Quality, 0.2);
        assert_eq!(gate.thresholds(Phase::Refine).unwrap()[&MetricKind::Quality], 0.2);
        assert!(gate.check(Phase::Completed, &PhaseMetrics::new()).passed);
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let gate = QualityGate::standard();
        let check = gate.check(Phase::Expand, &metrics(&[(MetricKind::Quality, f64::NAN)]));
        assert_eq!(
            check.checks[&MetricKind::Quality],
            MetricCheck::Missing { threshold: 0.5 }
        );
    }
}
