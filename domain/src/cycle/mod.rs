//! Cycle domain
//!
//! An EDRR cycle walks `Expand → Differentiate → Refine → Retrospect` and
//! ends in `Completed`. Micro-cycles are ordinary cycles with a parent id
//! and a depth greater than zero. The [`quality_gate`] reports whether a
//! phase's own metrics make it ready for the next phase.

pub mod entities;
pub mod quality_gate;
pub mod value_objects;

pub use entities::{Cycle, CycleStatus, Phase};
pub use quality_gate::{GateCheck, MetricCheck, MetricKind, PhaseMetrics, QualityGate};
pub use value_objects::{CycleId, CycleTask, HumanOverride, TaskMetrics};
