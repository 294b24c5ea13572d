//! Context merge engine.
//!
//! Owns the context of every cycle in a run. Each context sits behind its own
//! mutex, so merges into one cycle are serialized while other cycles proceed.

use edrr_domain::{Context, ContextSnapshot, CycleId, PhaseOutput};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("No context registered for cycle {0}")]
    UnknownCycle(CycleId),
}

#[derive(Default)]
pub struct ContextMergeEngine {
    contexts: Mutex<HashMap<CycleId, Arc<Mutex<Context>>>>,
}

impl ContextMergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty context for `cycle`. Existing contexts are kept.
    pub fn register(&self, cycle: &CycleId) {
        self.contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cycle.clone())
            .or_default();
    }

    fn slot(&self, cycle: &CycleId) -> Result<Arc<Mutex<Context>>, MergeError> {
        self.contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cycle)
            .cloned()
            .ok_or_else(|| MergeError::UnknownCycle(cycle.clone()))
    }

    /// Merge `output` into the cycle's context.
    ///
    /// Returns `false` when the output had already been merged.
    pub fn merge(&self, cycle: &CycleId, output: &PhaseOutput) -> Result<bool, MergeError> {
        let slot = self.slot(cycle)?;
        let mut context = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let applied = context.merge_in_place(output);
        debug!(
            cycle = %cycle,
            source = %output.source,
            fields = output.fields.len(),
            applied,
            "Merged phase output"
        );
        Ok(applied)
    }

    /// Copy of the cycle's current context.
    pub fn context(&self, cycle: &CycleId) -> Result<Context, MergeError> {
        let slot = self.slot(cycle)?;
        let context = slot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(context.clone())
    }

    pub fn snapshot(&self, cycle: &CycleId) -> Result<ContextSnapshot, MergeError> {
        let slot = self.slot(cycle)?;
        let context = slot.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(context.snapshot())
    }

    pub fn restore(&self, cycle: &CycleId, snapshot: ContextSnapshot) -> Result<(), MergeError> {
        let slot = self.slot(cycle)?;
        slot.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .restore(snapshot);
        Ok(())
    }

    /// Estimated bytes held by all contexts of the run.
    pub fn total_bytes(&self) -> u64 {
        let slots: Vec<_> = self
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .map(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .approx_bytes()
            })
            .sum()
    }
}
