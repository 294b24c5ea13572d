//! Run configuration for the EDRR coordinator.
//!
//! [`EdrrConfig`] groups everything a run needs to bound recursion and reach
//! decisions. The score thresholds and hard limits are domain types; the
//! recursion and consensus settings are application concerns.

use edrr_domain::{QualityGate, ResourceLimits, TerminationThresholds};

/// Deepest nesting a run may be configured for.
pub const MAX_RECURSION_DEPTH: u32 = 10;

/// Recursion bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct RecursionConfig {
    max_depth: u32,
    /// Micro-cycles a single phase of a single cycle may spawn.
    pub max_micro_cycles_per_phase: u32,
}

impl RecursionConfig {
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth: max_depth.min(MAX_RECURSION_DEPTH),
            ..Default::default()
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Set the depth limit, clamped into `[0, MAX_RECURSION_DEPTH]`.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth.min(MAX_RECURSION_DEPTH);
        self
    }

    pub fn with_max_micro_cycles_per_phase(mut self, budget: u32) -> Self {
        self.max_micro_cycles_per_phase = budget;
        self
    }
}

impl Default for RecursionConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_micro_cycles_per_phase: 3,
        }
    }
}

/// Voting behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusSettings {
    /// Tallies closer than this to the maximum count as tied.
    pub epsilon: f64,
    /// Ask the critic role for a dialectical critique before finalizing.
    pub critique: bool,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            critique: true,
        }
    }
}

/// Complete coordinator configuration.
#[derive(Debug, Clone, Default)]
pub struct EdrrConfig {
    pub recursion: RecursionConfig,
    pub thresholds: TerminationThresholds,
    pub limits: ResourceLimits,
    pub consensus: ConsensusSettings,
    /// Check phase metrics before moving on; `None` disables the gate.
    pub quality_gate: Option<QualityGate>,
}

impl EdrrConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.recursion = self.recursion.with_max_depth(max_depth);
        self
    }

    pub fn with_recursion(mut self, recursion: RecursionConfig) -> Self {
        self.recursion = recursion;
        self
    }

    pub fn with_thresholds(mut self, thresholds: TerminationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_consensus(mut self, consensus: ConsensusSettings) -> Self {
        self.consensus = consensus;
        self
    }

    pub fn with_quality_gate(mut self, gate: QualityGate) -> Self {
        self.quality_gate = Some(gate);
        self
    }
}
