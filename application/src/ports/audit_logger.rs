//! Port for the structured audit trail.
//!
//! Separate from `tracing`: tracing carries human-readable diagnostics, this
//! port records what the orchestrator decided (cycles, spawns, decisions,
//! flushes) in a machine-readable form such as JSONL.

use serde_json::Value;

/// A structured audit event.
pub struct AuditEvent {
    /// Event type identifier (e.g., "cycle_started", "decision", "memory_sync").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl AuditEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for recording audit events.
///
/// `log` is synchronous and infallible; adapters swallow their own I/O errors.
pub trait AuditLogger: Send + Sync {
    fn log(&self, event: AuditEvent);
}

/// No-op implementation for tests and when auditing is disabled.
pub struct NoAuditLogger;

impl AuditLogger for NoAuditLogger {
    fn log(&self, _event: AuditEvent) {}
}
