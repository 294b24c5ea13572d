//! Well-founded variant for cycle execution.
//!
//! `φ = 4·(max_depth − depth) + remaining(phase)`. Every phase transition
//! lowers `remaining` by one and every spawn produces a child whose φ is
//! strictly below its parent's, so a run always reaches `Completed`.

use crate::cycle::Phase;

/// Transitions a single cycle performs, expand handler included.
const STEPS_PER_CYCLE: u64 = 5;

/// Variant of a cycle at `depth` in `phase`.
pub fn phi(max_depth: u32, depth: u32, phase: Phase) -> u64 {
    4 * u64::from(max_depth.saturating_sub(depth)) + u64::from(phase.remaining())
}

/// Upper bound on the steps of one run.
///
/// Each cycle performs at most `5 + 4b` steps (four phase executions, the
/// completion transition and up to `b` spawns in each working phase) and has
/// at most `4b` children, so the bound is `(5 + 4b) · Σ_{k=0..D} (4b)^k`.
/// Saturates instead of overflowing for large budgets.
pub fn step_bound(max_depth: u32, spawn_budget: u32) -> u64 {
    let fan_out = 4 * u64::from(spawn_budget);
    let per_cycle = STEPS_PER_CYCLE + fan_out;

    let mut cycles: u64 = 0;
    let mut level: u64 = 1;
    for _ in 0..=max_depth {
        cycles = cycles.saturating_add(level);
        level = level.saturating_mul(fan_out);
    }
    per_cycle.saturating_mul(cycles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phi_values() {
        assert_eq!(phi(3, 0, Phase::Expand), 16);
        assert_eq!(phi(3, 0, Phase::Completed), 12);
        assert_eq!(phi(3, 3, Phase::Retrospect), 1);
        assert_eq!(phi(3, 3, Phase::Completed), 0);
    }

    #[test]
    fn test_child_phi_below_parent_in_any_phase() {
        let max_depth = 3;
        for depth in 0..max_depth {
            for parent_phase in Phase::WORKING {
                let parent = phi(max_depth, depth, parent_phase);
                let child = phi(max_depth, depth + 1, Phase::Expand);
                assert!(child < parent, "depth {depth} phase {parent_phase}");
            }
        }
    }

    #[test]
    fn test_step_bound() {
        // No spawning: one cycle, five steps.
        assert_eq!(step_bound(3, 0), 5);
        // b = 1, D = 1: (5 + 4) * (1 + 4)
        assert_eq!(step_bound(1, 1), 45);
        // defaults: b = 3, D = 3: 17 * (1 + 12 + 144 + 1728)
        assert_eq!(step_bound(3, 3), 17 * 1885);
    }

    #[test]
    fn test_step_bound_saturates() {
        assert_eq!(step_bound(10, u32::MAX), u64::MAX);
    }
}
