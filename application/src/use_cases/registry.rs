//! Flat cycle registry.
//!
//! Every cycle of a run lives here keyed by id; children point at their parent
//! by id instead of being owned by it.

use edrr_domain::{Cycle, CycleId, Phase};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CycleRegistry {
    cycles: HashMap<CycleId, Cycle>,
    order: Vec<CycleId>,
    spawns: HashMap<(CycleId, Phase), u32>,
}

impl CycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cycle; returns its id. A cycle with the same id is replaced.
    pub fn insert(&mut self, cycle: Cycle) -> CycleId {
        let id = cycle.id().clone();
        if self.cycles.insert(id.clone(), cycle).is_none() {
            self.order.push(id.clone());
        }
        id
    }

    pub fn get(&self, id: &CycleId) -> Option<&Cycle> {
        self.cycles.get(id)
    }

    pub fn get_mut(&mut self, id: &CycleId) -> Option<&mut Cycle> {
        self.cycles.get_mut(id)
    }

    pub fn contains(&self, id: &CycleId) -> bool {
        self.cycles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Cycles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Cycle> {
        self.order.iter().filter_map(|id| self.cycles.get(id))
    }

    pub fn children_of<'a>(&'a self, parent: &'a CycleId) -> impl Iterator<Item = &'a Cycle> + 'a {
        self.iter().filter(move |c| c.parent_id() == Some(parent))
    }

    /// Micro-cycles already spawned from `phase` of `parent`.
    pub fn spawn_count(&self, parent: &CycleId, phase: Phase) -> u32 {
        self.spawns
            .get(&(parent.clone(), phase))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn record_spawn(&mut self, parent: &CycleId, phase: Phase) {
        *self.spawns.entry((parent.clone(), phase)).or_insert(0) += 1;
    }

    pub fn max_depth(&self) -> u32 {
        self.cycles.values().map(Cycle::depth).max().unwrap_or(0)
    }
}
