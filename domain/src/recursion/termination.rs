//! Termination heuristics for micro-cycle spawning.
//!
//! The evaluator is an ordered list of named criteria. Criteria run in order
//! and the first one that decides wins; a criterion whose inputs are missing
//! abstains. Limits are only looked at when a spawn is attempted.

use crate::cycle::{CycleTask, HumanOverride, Phase};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Score thresholds for the task-metric criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationThresholds {
    /// Stop when the granularity score falls below this.
    pub granularity: f64,
    /// Stop when cost / benefit exceeds this.
    pub cost_benefit_ratio: f64,
    /// Stop when quality reaches this.
    pub quality: f64,
    /// Stop when resource usage exceeds this.
    pub resource_limit: f64,
    /// Stop when complexity exceeds this.
    pub complexity: f64,
    /// Stop when convergence exceeds this.
    pub convergence: f64,
    /// Stop when the improvement rate falls below this.
    pub diminishing_returns: f64,
    /// Stop when past recursion for the task type was less effective than this.
    pub historical_effectiveness: f64,
    /// Number of metrics in their warning band that together stop recursion.
    pub moderate_factor_count: usize,
}

impl Default for TerminationThresholds {
    fn default() -> Self {
        Self {
            granularity: 0.2,
            cost_benefit_ratio: 0.5,
            quality: 0.9,
            resource_limit: 0.8,
            complexity: 0.7,
            convergence: 0.85,
            diminishing_returns: 0.3,
            historical_effectiveness: 0.5,
            moderate_factor_count: 3,
        }
    }
}

/// Hard limits polled at spawn points.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    pub time_limit: Duration,
    /// Bytes of estimated context memory.
    pub memory_limit: u64,
    /// Fraction of a limit at which recursion is declined pre-emptively.
    pub soft_limit_ratio: f64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(300),
            memory_limit: 64 * 1024 * 1024,
            soft_limit_ratio: 0.9,
        }
    }
}

/// Name of a termination criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    HumanOverride,
    GranularityThreshold,
    CostBenefit,
    QualitySufficient,
    ResourceLimit,
    ComplexityBound,
    Converged,
    DiminishingReturns,
    ParentPhaseIncompatible,
    HistoricalIneffectiveness,
    MaxDepthReached,
    TimeLimit,
    MemoryLimit,
    ApproachingLimits,
    ModerateFactors,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::HumanOverride => "human_override",
            TerminationReason::GranularityThreshold => "granularity_threshold",
            TerminationReason::CostBenefit => "cost_benefit",
            TerminationReason::QualitySufficient => "quality_sufficient",
            TerminationReason::ResourceLimit => "resource_limit",
            TerminationReason::ComplexityBound => "complexity_bound",
            TerminationReason::Converged => "converged",
            TerminationReason::DiminishingReturns => "diminishing_returns",
            TerminationReason::ParentPhaseIncompatible => "parent_phase_incompatible",
            TerminationReason::HistoricalIneffectiveness => "historical_ineffectiveness",
            TerminationReason::MaxDepthReached => "max_depth_reached",
            TerminationReason::TimeLimit => "time_limit",
            TerminationReason::MemoryLimit => "memory_limit",
            TerminationReason::ApproachingLimits => "approaching_limits",
            TerminationReason::ModerateFactors => "moderate_factors",
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationDecision {
    pub terminate: bool,
    /// The criterion that decided, if any did.
    pub criterion: Option<TerminationReason>,
    pub detail: String,
}

impl TerminationDecision {
    fn proceed(criterion: Option<TerminationReason>, detail: impl Into<String>) -> Self {
        Self {
            terminate: false,
            criterion,
            detail: detail.into(),
        }
    }

    fn stop(criterion: TerminationReason, detail: impl Into<String>) -> Self {
        Self {
            terminate: true,
            criterion: Some(criterion),
            detail: detail.into(),
        }
    }

    /// Name of the terminating criterion, or `"continue"`.
    pub fn reason(&self) -> &'static str {
        match (self.terminate, self.criterion) {
            (true, Some(criterion)) => criterion.as_str(),
            _ => "continue",
        }
    }
}

/// Result of a single criterion.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Terminate(String),
    /// Continue and skip the remaining criteria.
    Continue(String),
    Abstain,
}

/// Past effectiveness of recursion for a task type (0.0 ..= 1.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessRecord {
    pub task_type: String,
    pub effectiveness: f64,
    pub cycle_id: String,
}

/// Everything the criteria look at for one spawn attempt.
#[derive(Debug, Clone)]
pub struct TerminationProbe<'a> {
    /// Task of the prospective micro-cycle.
    pub task: &'a CycleTask,
    pub parent_depth: u32,
    pub max_depth: u32,
    /// Phase the micro-cycle is requested for.
    pub target_phase: Phase,
    /// Current phase of the parent.
    pub parent_phase: Phase,
    /// Phase of the grandparent in which the parent itself was spawned.
    pub parent_origin: Option<Phase>,
    pub elapsed: Duration,
    /// Estimated bytes held by contexts of the run.
    pub memory_usage: u64,
    pub history: &'a [EffectivenessRecord],
}

type Check = fn(&TerminationProbe<'_>, &TerminationThresholds, &ResourceLimits) -> Verdict;

/// A named, ordered predicate.
#[derive(Clone)]
pub struct Criterion {
    pub reason: TerminationReason,
    check: Check,
}

impl Criterion {
    pub fn new(reason: TerminationReason, check: Check) -> Self {
        Self { reason, check }
    }
}

impl std::fmt::Debug for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Criterion")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

/// Ordered evaluator over [`Criterion`]s.
#[derive(Debug, Clone)]
pub struct TerminationEvaluator {
    thresholds: TerminationThresholds,
    limits: ResourceLimits,
    criteria: Vec<Criterion>,
}

impl TerminationEvaluator {
    /// The fifteen standard criteria, in their fixed order.
    pub fn standard(thresholds: TerminationThresholds, limits: ResourceLimits) -> Self {
        use TerminationReason::*;

        let criteria = vec![
            Criterion::new(HumanOverride, human_override),
            Criterion::new(GranularityThreshold, granularity),
            Criterion::new(CostBenefit, cost_benefit),
            Criterion::new(QualitySufficient, quality),
            Criterion::new(ResourceLimit, resource),
            Criterion::new(ComplexityBound, complexity),
            Criterion::new(Converged, convergence),
            Criterion::new(DiminishingReturns, diminishing_returns),
            Criterion::new(ParentPhaseIncompatible, parent_phase),
            Criterion::new(HistoricalIneffectiveness, historical),
            Criterion::new(MaxDepthReached, max_depth),
            Criterion::new(TimeLimit, time_limit),
            Criterion::new(MemoryLimit, memory_limit),
            Criterion::new(ApproachingLimits, approaching_limits),
            Criterion::new(ModerateFactors, moderate_factors),
        ];

        Self {
            thresholds,
            limits,
            criteria,
        }
    }

    pub fn thresholds(&self) -> &TerminationThresholds {
        &self.thresholds
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn criteria_names(&self) -> Vec<&'static str> {
        self.criteria.iter().map(|c| c.reason.as_str()).collect()
    }

    /// Drop a criterion from the list.
    pub fn without(mut self, reason: TerminationReason) -> Self {
        self.criteria.retain(|c| c.reason != reason);
        self
    }

    pub fn evaluate(&self, probe: &TerminationProbe<'_>) -> TerminationDecision {
        for criterion in &self.criteria {
            match (criterion.check)(probe, &self.thresholds, &self.limits) {
                Verdict::Terminate(detail) => {
                    return TerminationDecision::stop(criterion.reason, detail);
                }
                Verdict::Continue(detail) => {
                    return TerminationDecision::proceed(Some(criterion.reason), detail);
                }
                Verdict::Abstain => {}
            }
        }
        TerminationDecision::proceed(None, "no termination criterion satisfied")
    }
}

impl Default for TerminationEvaluator {
    fn default() -> Self {
        Self::standard(TerminationThresholds::default(), ResourceLimits::default())
    }
}

fn human_override(p: &TerminationProbe<'_>, _: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    match p.task.metrics.human_override {
        Some(HumanOverride::Terminate) => Verdict::Terminate("human override: terminate".into()),
        Some(HumanOverride::Continue) => Verdict::Continue("human override: continue".into()),
        None => Verdict::Abstain,
    }
}

fn granularity(p: &TerminationProbe<'_>, t: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    match p.task.metrics.granularity_score {
        Some(score) if score < t.granularity => {
            Verdict::Terminate(format!("granularity {score} < {}", t.granularity))
        }
        _ => Verdict::Abstain,
    }
}

fn cost_benefit(p: &TerminationProbe<'_>, t: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    match p.task.metrics.cost_benefit_ratio() {
        Some(ratio) if ratio > t.cost_benefit_ratio => {
            Verdict::Terminate(format!("cost/benefit {ratio} > {}", t.cost_benefit_ratio))
        }
        _ => Verdict::Abstain,
    }
}

fn quality(p: &TerminationProbe<'_>, t: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    match p.task.metrics.quality_score {
        Some(score) if score >= t.quality => {
            Verdict::Terminate(format!("quality {score} >= {}", t.quality))
        }
        _ => Verdict::Abstain,
    }
}

fn resource(p: &TerminationProbe<'_>, t: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    match p.task.metrics.resource_usage {
        Some(usage) if usage > t.resource_limit => {
            Verdict::Terminate(format!("resource usage {usage} > {}", t.resource_limit))
        }
        _ => Verdict::Abstain,
    }
}

fn complexity(p: &TerminationProbe<'_>, t: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    match p.task.metrics.complexity_score {
        Some(score) if score > t.complexity => {
            Verdict::Terminate(format!("complexity {score} > {}", t.complexity))
        }
        _ => Verdict::Abstain,
    }
}

fn convergence(p: &TerminationProbe<'_>, t: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    match p.task.metrics.convergence_score {
        Some(score) if score > t.convergence => {
            Verdict::Terminate(format!("convergence {score} > {}", t.convergence))
        }
        _ => Verdict::Abstain,
    }
}

fn diminishing_returns(
    p: &TerminationProbe<'_>,
    t: &TerminationThresholds,
    _: &ResourceLimits,
) -> Verdict {
    match p.task.metrics.improvement_rate {
        Some(rate) if rate < t.diminishing_returns => {
            Verdict::Terminate(format!("improvement rate {rate} < {}", t.diminishing_returns))
        }
        _ => Verdict::Abstain,
    }
}

fn parent_phase(p: &TerminationProbe<'_>, _: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    if p.target_phase != p.parent_phase {
        return Verdict::Terminate(format!(
            "requested for {} while parent is in {}",
            p.target_phase, p.parent_phase
        ));
    }
    if p.parent_origin == Some(Phase::Retrospect) {
        return Verdict::Terminate("parent was spawned during retrospect".into());
    }
    Verdict::Abstain
}

fn historical(p: &TerminationProbe<'_>, t: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    let Some(task_type) = p.task.task_type.as_deref() else {
        return Verdict::Abstain;
    };
    let scores: Vec<f64> = p
        .history
        .iter()
        .filter(|record| record.task_type == task_type)
        .map(|record| record.effectiveness)
        .collect();
    if scores.is_empty() {
        return Verdict::Abstain;
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    if mean < t.historical_effectiveness {
        Verdict::Terminate(format!(
            "past recursion on '{task_type}' averaged {mean:.2} < {}",
            t.historical_effectiveness
        ))
    } else {
        Verdict::Abstain
    }
}

fn max_depth(p: &TerminationProbe<'_>, _: &TerminationThresholds, _: &ResourceLimits) -> Verdict {
    if p.parent_depth >= p.max_depth {
        Verdict::Terminate(format!("depth {} >= max depth {}", p.parent_depth, p.max_depth))
    } else {
        Verdict::Abstain
    }
}

fn time_limit(p: &TerminationProbe<'_>, _: &TerminationThresholds, l: &ResourceLimits) -> Verdict {
    if p.elapsed >= l.time_limit {
        Verdict::Terminate(format!(
            "elapsed {:?} >= time limit {:?}",
            p.elapsed, l.time_limit
        ))
    } else {
        Verdict::Abstain
    }
}

fn memory_limit(p: &TerminationProbe<'_>, _: &TerminationThresholds, l: &ResourceLimits) -> Verdict {
    if p.memory_usage > l.memory_limit {
        Verdict::Terminate(format!(
            "memory {} bytes > limit {} bytes",
            p.memory_usage, l.memory_limit
        ))
    } else {
        Verdict::Abstain
    }
}

fn approaching_limits(
    p: &TerminationProbe<'_>,
    t: &TerminationThresholds,
    l: &ResourceLimits,
) -> Verdict {
    let ratio = l.soft_limit_ratio;
    if p.elapsed.as_secs_f64() >= l.time_limit.as_secs_f64() * ratio {
        return Verdict::Terminate(format!("elapsed time within {ratio} of the limit"));
    }
    if p.memory_usage as f64 >= l.memory_limit as f64 * ratio {
        return Verdict::Terminate(format!("memory usage within {ratio} of the limit"));
    }
    match p.task.metrics.resource_usage {
        Some(usage) if usage >= t.resource_limit * ratio => {
            Verdict::Terminate(format!("resource usage within {ratio} of the limit"))
        }
        _ => Verdict::Abstain,
    }
}

/// Metrics inside their warning band (close to, but not past, their threshold).
fn moderate_factor_names(p: &TerminationProbe<'_>, t: &TerminationThresholds) -> Vec<&'static str> {
    let m = &p.task.metrics;
    let bands = [
        ("granularity", m.granularity_score.map(|v| v < t.granularity * 2.0)),
        (
            "cost_benefit",
            m.cost_benefit_ratio().map(|v| v > t.cost_benefit_ratio * 0.75),
        ),
        ("quality", m.quality_score.map(|v| v >= t.quality * 0.8)),
        ("resource", m.resource_usage.map(|v| v > t.resource_limit * 0.75)),
        ("complexity", m.complexity_score.map(|v| v > t.complexity * 0.75)),
        ("convergence", m.convergence_score.map(|v| v > t.convergence * 0.75)),
        (
            "improvement",
            m.improvement_rate.map(|v| v < t.diminishing_returns * 1.5),
        ),
    ];
    bands
        .into_iter()
        .filter(|(_, hit)| *hit == Some(true))
        .map(|(name, _)| name)
        .collect()
}

fn moderate_factors(
    p: &TerminationProbe<'_>,
    t: &TerminationThresholds,
    _: &ResourceLimits,
) -> Verdict {
    let hits = moderate_factor_names(p, t);
    if hits.len() >= t.moderate_factor_count {
        Verdict::Terminate(format!("moderate factors: {}", hits.join(", ")))
    } else {
        Verdict::Abstain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::TaskMetrics;

    fn task(metrics: TaskMetrics) -> CycleTask {
        CycleTask::new("sub", "investigate").with_metrics(metrics)
    }

    fn probe<'a>(task: &'a CycleTask, history: &'a [EffectivenessRecord]) -> TerminationProbe<'a> {
        TerminationProbe {
            task,
            parent_depth: 0,
            max_depth: 3,
            target_phase: Phase::Expand,
            parent_phase: Phase::Expand,
            parent_origin: None,
            elapsed: Duration::ZERO,
            memory_usage: 0,
            history,
        }
    }

    fn evaluate(probe: &TerminationProbe<'_>) -> TerminationDecision {
        TerminationEvaluator::default().evaluate(probe)
    }

    #[test]
    fn test_fixed_order() {
        let names = TerminationEvaluator::default().criteria_names();
        assert_eq!(names.len(), 15);
        assert_eq!(names[0], "human_override");
        assert_eq!(names[3], "quality_sufficient");
        assert_eq!(names[14], "moderate_factors");
    }

    #[test]
    fn test_no_metrics_continues() {
        let t = task(TaskMetrics::default());
        let decision = evaluate(&probe(&t, &[]));
        assert!(!decision.terminate);
        assert_eq!(decision.reason(), "continue");
        assert_eq!(decision.criterion, None);
    }

    #[test]
    fn test_each_metric_criterion() {
        let cases = [
            (TaskMetrics::default().with_granularity(0.1), "granularity_threshold"),
            (TaskMetrics::default().with_cost_benefit(0.8, 1.0), "cost_benefit"),
            (TaskMetrics::default().with_cost_benefit(0.1, 0.0), "cost_benefit"),
            (TaskMetrics::default().with_quality(0.95), "quality_sufficient"),
            (TaskMetrics::default().with_resource_usage(0.85), "resource_limit"),
            (TaskMetrics::default().with_complexity(0.75), "complexity_bound"),
            (TaskMetrics::default().with_convergence(0.9), "converged"),
            (TaskMetrics::default().with_improvement_rate(0.1), "diminishing_returns"),
        ];
        for (metrics, expected) in cases {
            let t = task(metrics);
            let decision = evaluate(&probe(&t, &[]));
            assert!(decision.terminate, "{expected}");
            assert_eq!(decision.reason(), expected);
        }
    }

    #[test]
    fn test_quality_boundary_is_inclusive() {
        let t = task(TaskMetrics::default().with_quality(0.9));
        assert_eq!(evaluate(&probe(&t, &[])).reason(), "quality_sufficient");
    }

    #[test]
    fn test_metrics_below_thresholds_continue() {
        let t = task(
            TaskMetrics::default()
                .with_granularity(0.8)
                .with_cost_benefit(0.2, 1.0)
                .with_quality(0.5),
        );
        assert!(!evaluate(&probe(&t, &[])).terminate);
    }

    #[test]
    fn test_human_override() {
        let t = task(TaskMetrics::default().with_override(HumanOverride::Terminate));
        assert_eq!(evaluate(&probe(&t, &[])).reason(), "human_override");

        // Continue wins over an otherwise terminating metric.
        let t = task(
            TaskMetrics::default()
                .with_override(HumanOverride::Continue)
                .with_quality(0.99),
        );
        let decision = evaluate(&probe(&t, &[]));
        assert!(!decision.terminate);
        assert_eq!(decision.criterion, Some(TerminationReason::HumanOverride));
    }

    #[test]
    fn test_first_satisfied_criterion_wins() {
        let t = task(
            TaskMetrics::default()
                .with_granularity(0.1)
                .with_quality(0.95),
        );
        assert_eq!(evaluate(&probe(&t, &[])).reason(), "granularity_threshold");
    }

    #[test]
    fn test_parent_phase_incompatible() {
        let t = task(TaskMetrics::default());
        let mut p = probe(&t, &[]);
        p.target_phase = Phase::Refine;
        assert_eq!(evaluate(&p).reason(), "parent_phase_incompatible");

        let mut p = probe(&t, &[]);
        p.parent_depth = 1;
        p.parent_origin = Some(Phase::Retrospect);
        assert_eq!(evaluate(&p).reason(), "parent_phase_incompatible");
    }

    #[test]
    fn test_historical_ineffectiveness() {
        let t = CycleTask::new("sub", "tune").with_type("optimization");
        let history = vec![
            EffectivenessRecord {
                task_type: "optimization".into(),
                effectiveness: 0.3,
                cycle_id: "c1".into(),
            },
            EffectivenessRecord {
                task_type: "analysis".into(),
                effectiveness: 0.9,
                cycle_id: "c2".into(),
            },
        ];
        assert_eq!(
            evaluate(&probe(&t, &history)).reason(),
            "historical_ineffectiveness"
        );

        let other = CycleTask::new("sub", "read").with_type("analysis");
        assert!(!evaluate(&probe(&other, &history)).terminate);
    }

    #[test]
    fn test_max_depth_reached() {
        let t = task(TaskMetrics::default());
        let mut p = probe(&t, &[]);
        p.parent_depth = 3;
        assert_eq!(evaluate(&p).reason(), "max_depth_reached");
    }

    #[test]
    fn test_time_and_memory_limits() {
        let t = task(TaskMetrics::default());

        let mut p = probe(&t, &[]);
        p.elapsed = Duration::from_secs(300);
        assert_eq!(evaluate(&p).reason(), "time_limit");

        let mut p = probe(&t, &[]);
        p.memory_usage = 64 * 1024 * 1024 + 1;
        assert_eq!(evaluate(&p).reason(), "memory_limit");
    }

    #[test]
    fn test_approaching_limits() {
        let t = task(TaskMetrics::default());
        let mut p = probe(&t, &[]);
        p.elapsed = Duration::from_secs(280);
        assert_eq!(evaluate(&p).reason(), "approaching_limits");

        // 0.75 is under the hard limit (0.8) but above 0.9 * 0.8.
        let t = task(TaskMetrics::default().with_resource_usage(0.75));
        assert_eq!(evaluate(&probe(&t, &[])).reason(), "approaching_limits");
    }

    #[test]
    fn test_moderate_factors() {
        let t = task(
            TaskMetrics::default()
                .with_granularity(0.3)
                .with_quality(0.75)
                .with_complexity(0.6),
        );
        let decision = evaluate(&probe(&t, &[]));
        assert_eq!(decision.reason(), "moderate_factors");
        assert!(decision.detail.contains("granularity"));

        let t = task(TaskMetrics::default().with_granularity(0.3).with_quality(0.75));
        assert!(!evaluate(&probe(&t, &[])).terminate);
    }

    #[test]
    fn test_without_removes_criterion() {
        let evaluator = TerminationEvaluator::default().without(TerminationReason::QualitySufficient);
        let t = task(TaskMetrics::default().with_quality(0.95));
        assert!(!evaluator.evaluate(&probe(&t, &[])).terminate);
        assert_eq!(evaluator.criteria_names().len(), 14);
    }
}
