//! Progress notification port
//!
//! Defines the interface for reporting progress while cycles run.

use edrr_domain::{Cycle, CycleId, Decision, Phase, TerminationDecision};

/// Callback for progress updates during a run
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, web UI, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called before a phase executes
    fn on_phase_start(&self, cycle: &Cycle, phase: Phase);

    /// Called after a phase's output was merged
    fn on_phase_complete(&self, cycle: &Cycle, phase: Phase);

    /// Called when a micro-cycle was created
    fn on_micro_cycle(&self, _parent: &CycleId, _child: &Cycle) {}

    /// Called when the heuristics declined a micro-cycle
    fn on_spawn_declined(&self, _parent: &CycleId, _decision: &TerminationDecision) {}

    /// Called for every finalized decision
    fn on_decision(&self, _decision: &Decision) {}

    /// Called when a cycle reaches `completed`
    fn on_cycle_complete(&self, _cycle: &Cycle) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_phase_start(&self, _cycle: &Cycle, _phase: Phase) {}
    fn on_phase_complete(&self, _cycle: &Cycle, _phase: Phase) {}
}
