//! Progress reporting while cycles run

use colored::Colorize;
use edrr_application::ProgressNotifier;
use edrr_domain::{Cycle, CycleId, Decision, Phase, TerminationDecision};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;

/// Working phases per cycle; the bar length of every cycle.
const PHASES_PER_CYCLE: u64 = 4;

/// One progress bar per running cycle, indented by depth
pub struct ProgressReporter {
    multi: MultiProgress,
    bars: Mutex<HashMap<CycleId, ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn cycle_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:20.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn prefix(cycle: &Cycle) -> String {
        format!("{}{}", "  ".repeat(cycle.depth() as usize), cycle.task().id)
    }

    fn with_bar(&self, cycle: &Cycle, f: impl FnOnce(&ProgressBar)) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        let bar = bars.entry(cycle.id().clone()).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(PHASES_PER_CYCLE));
            bar.set_style(Self::cycle_style());
            bar.set_prefix(Self::prefix(cycle));
            bar
        });
        f(bar);
    }

    fn note(&self, line: String) {
        let _ = self.multi.println(line);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, cycle: &Cycle, phase: Phase) {
        self.with_bar(cycle, |bar| bar.set_message(format!("{}...", phase.display_name())));
    }

    fn on_phase_complete(&self, cycle: &Cycle, _phase: Phase) {
        self.with_bar(cycle, |bar| bar.inc(1));
    }

    fn on_micro_cycle(&self, _parent: &CycleId, child: &Cycle) {
        self.with_bar(child, |bar| bar.set_message("spawned"));
    }

    fn on_spawn_declined(&self, _parent: &CycleId, decision: &TerminationDecision) {
        self.note(format!("  {} micro-cycle declined: {}", "-".yellow(), decision.reason()));
    }

    fn on_decision(&self, decision: &Decision) {
        self.note(format!(
            "  {} {}: {} ({})",
            "*".cyan(),
            decision.topic,
            decision.chosen(),
            decision.method
        ));
    }

    fn on_cycle_complete(&self, cycle: &Cycle) {
        if let Ok(mut bars) = self.bars.lock()
            && let Some(bar) = bars.remove(cycle.id())
        {
            bar.finish_with_message(format!("{}", "complete".green()));
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, cycle: &Cycle, phase: Phase) {
        println!(
            "{}{} {} {}",
            "  ".repeat(cycle.depth() as usize),
            "->".cyan(),
            cycle.task().id,
            phase.display_name().bold()
        );
    }

    fn on_phase_complete(&self, _cycle: &Cycle, _phase: Phase) {}

    fn on_spawn_declined(&self, parent: &CycleId, decision: &TerminationDecision) {
        println!("  {} {} declined a micro-cycle: {}", "x".yellow(), parent, decision.reason());
    }

    fn on_cycle_complete(&self, cycle: &Cycle) {
        println!(
            "{}{} {} complete",
            "  ".repeat(cycle.depth() as usize),
            "v".green(),
            cycle.task().id
        );
    }
}
