//! Phase gate use case
//!
//! Checks a phase's reported metrics against the [`QualityGate`] before the
//! cycle moves on. When the gate stays closed, recovery hooks for that phase
//! run in registration order and may patch the metrics; the first hook that
//! reports `recovered` ends recovery. The gate is then checked again on the
//! patched metrics and, if the phase is still not ready, the failure hooks
//! are notified.
//!
//! The verdict is advisory: the phase order never changes, a closed gate is
//! reported and logged.

use crate::use_cases::hooks::HookRegistry;
use edrr_domain::{CycleId, GateCheck, Phase, PhaseMetrics, QualityGate};
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// What a recovery hook did about a closed gate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recovery {
    /// Stop running further recovery hooks and check the gate again.
    pub recovered: bool,
    /// Metric values to overwrite before the next check.
    pub metrics: PhaseMetrics,
}

impl Recovery {
    pub fn recovered(metrics: PhaseMetrics) -> Self {
        Self {
            recovered: true,
            metrics,
        }
    }

    pub fn partial(metrics: PhaseMetrics) -> Self {
        Self {
            recovered: false,
            metrics,
        }
    }
}

/// Sent to failure hooks when a phase is not ready after recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct GateFailure {
    pub cycle: CycleId,
    pub check: GateCheck,
    pub metrics: PhaseMetrics,
}

/// Outcome of gating one phase of one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateVerdict {
    pub cycle: CycleId,
    pub phase: Phase,
    pub ready: bool,
    /// A recovery hook reported success.
    pub recovered: bool,
    pub check: GateCheck,
    /// Metrics after recovery patches.
    pub metrics: PhaseMetrics,
}

type RecoveryFn = Arc<dyn Fn(&PhaseMetrics) -> Result<Recovery, String> + Send + Sync>;

struct RecoveryHook {
    name: String,
    phase: Phase,
    callback: RecoveryFn,
}

pub struct PhaseGate {
    gate: QualityGate,
    recovery: RwLock<Vec<Arc<RecoveryHook>>>,
    failure: HookRegistry<GateFailure>,
}

impl PhaseGate {
    pub fn new(gate: QualityGate) -> Self {
        Self {
            gate,
            recovery: RwLock::new(Vec::new()),
            failure: HookRegistry::new(),
        }
    }

    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    /// Register a recovery hook for `phase`.
    pub fn register_recovery_hook<F>(&self, name: impl Into<String>, phase: Phase, hook: F)
    where
        F: Fn(&PhaseMetrics) -> Result<Recovery, String> + Send + Sync + 'static,
    {
        self.recovery
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(RecoveryHook {
                name: name.into(),
                phase,
                callback: Arc::new(hook),
            }));
    }

    /// Register a hook notified when a phase stays below its thresholds.
    pub fn register_failure_hook<F>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn(&GateFailure) -> Result<(), String> + Send + Sync + 'static,
    {
        self.failure.register(name, hook);
    }

    /// Gate `phase` of `cycle` on the metrics its execution reported.
    pub fn evaluate(&self, cycle: &CycleId, phase: Phase, metrics: PhaseMetrics) -> GateVerdict {
        let mut metrics = metrics;
        let check = self.gate.check(phase, &metrics);
        if check.passed {
            debug!(cycle = %cycle, phase = %phase, "Quality gate passed");
            return GateVerdict {
                cycle: cycle.clone(),
                phase,
                ready: true,
                recovered: false,
                check,
                metrics,
            };
        }

        let recovered = self.recover(phase, &mut metrics);
        let check = self.gate.check(phase, &metrics);

        if check.passed {
            info!(cycle = %cycle, phase = %phase, "Quality gate passed after recovery");
        } else {
            let failing = check
                .failing()
                .map(|(metric, result)| format!("{metric}: {result}"))
                .collect::<Vec<_>>()
                .join(", ");
            warn!(cycle = %cycle, phase = %phase, "Phase not ready: {}", failing);
            self.failure.emit(&GateFailure {
                cycle: cycle.clone(),
                check: check.clone(),
                metrics: metrics.clone(),
            });
        }

        GateVerdict {
            cycle: cycle.clone(),
            phase,
            ready: check.passed,
            recovered,
            check,
            metrics,
        }
    }

    /// Run the recovery hooks of `phase`; true once one reports recovery.
    fn recover(&self, phase: Phase, metrics: &mut PhaseMetrics) -> bool {
        let hooks: Vec<Arc<RecoveryHook>> = self
            .recovery
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|hook| hook.phase == phase)
            .cloned()
            .collect();

        for hook in hooks {
            let outcome = catch_unwind(AssertUnwindSafe(|| (hook.callback)(metrics)));
            match outcome {
                Ok(Ok(recovery)) => {
                    metrics.extend(recovery.metrics);
                    if recovery.recovered {
                        debug!(hook = %hook.name, phase = %phase, "Recovery hook recovered the phase");
                        return true;
                    }
                }
                Ok(Err(message)) => warn!("Recovery hook '{}' failed: {}", hook.name, message),
                Err(_) => warn!("Recovery hook '{}' panicked", hook.name),
            }
        }
        false
    }
}

impl Default for PhaseGate {
    fn default() -> Self {
        Self::new(QualityGate::standard())
    }
}
