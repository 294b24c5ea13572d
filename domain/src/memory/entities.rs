//! Memory domain entities
//!
//! Keys, queued updates and synchronization states shared by the memory
//! ports and the sync coordinator.

use crate::core::time::now_millis;
use crate::cycle::Phase;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of record persisted for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    RoleAssignment,
    PhaseTransition,
    PhaseResult,
    MicroCycle,
    Decision,
    /// Final context of a completed cycle
    CycleSummary,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::RoleAssignment => "role_assignment",
            RecordKind::PhaseTransition => "phase_transition",
            RecordKind::PhaseResult => "phase_result",
            RecordKind::MicroCycle => "micro_cycle",
            RecordKind::Decision => "decision",
            RecordKind::CycleSummary => "cycle_summary",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Address of a persisted artifact: `(edrr phase, task or topic id, record kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryKey {
    pub phase: Option<Phase>,
    pub subject: String,
    pub kind: RecordKind,
}

impl MemoryKey {
    pub fn new(phase: Option<Phase>, subject: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            phase,
            subject: subject.into(),
            kind,
        }
    }

    pub fn in_phase(phase: Phase, subject: impl Into<String>, kind: RecordKind) -> Self {
        Self::new(Some(phase), subject, kind)
    }
}

impl std::fmt::Display for MemoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.phase {
            Some(phase) => write!(f, "{}/{}/{}", phase, self.subject, self.kind),
            None => write!(f, "-/{}/{}", self.subject, self.kind),
        }
    }
}

/// Which stores an update is meant for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreTarget {
    /// Every configured store
    All,
    Named(String),
}

impl StoreTarget {
    pub fn includes(&self, store: &str) -> bool {
        match self {
            StoreTarget::All => true,
            StoreTarget::Named(name) => name == store,
        }
    }
}

/// Operation carried by an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum MemoryOperation {
    Put(Value),
    Remove,
}

/// A write waiting in the sync queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUpdate {
    pub target: StoreTarget,
    pub key: MemoryKey,
    pub operation: MemoryOperation,
    /// Milliseconds since epoch
    pub queued_at: u64,
}

impl MemoryUpdate {
    pub fn put(target: StoreTarget, key: MemoryKey, value: Value) -> Self {
        Self {
            target,
            key,
            operation: MemoryOperation::Put(value),
            queued_at: now_millis(),
        }
    }

    pub fn remove(target: StoreTarget, key: MemoryKey) -> Self {
        Self {
            target,
            key,
            operation: MemoryOperation::Remove,
            queued_at: now_millis(),
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.operation {
            MemoryOperation::Put(value) => Some(value),
            MemoryOperation::Remove => None,
        }
    }
}

/// State of the sync coordinator's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Queued,
    Flushing,
    Committed,
    RolledBack,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Queued => "queued",
            SyncState::Flushing => "flushing",
            SyncState::Committed => "committed",
            SyncState::RolledBack => "rolled_back",
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_display() {
        let key = MemoryKey::in_phase(Phase::Differentiate, "approach", RecordKind::Decision);
        assert_eq!(key.to_string(), "differentiate/approach/decision");
        let key = MemoryKey::new(None, "c-1", RecordKind::CycleSummary);
        assert_eq!(key.to_string(), "-/c-1/cycle_summary");
    }

    #[test]
    fn test_target_includes() {
        assert!(StoreTarget::All.includes("vector"));
        assert!(StoreTarget::Named("graph".into()).includes("graph"));
        assert!(!StoreTarget::Named("graph".into()).includes("vector"));
    }

    #[test]
    fn test_update_payload() {
        let key = MemoryKey::in_phase(Phase::Expand, "t", RecordKind::PhaseResult);
        let put = MemoryUpdate::put(StoreTarget::All, key.clone(), json!({"a": 1}));
        assert_eq!(put.payload(), Some(&json!({"a": 1})));
        assert!(put.queued_at > 0);
        assert_eq!(MemoryUpdate::remove(StoreTarget::All, key).payload(), None);
    }
}
