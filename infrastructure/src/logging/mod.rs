//! Audit trail adapters.
//!
//! Provides [`JsonlAuditLogger`], a JSONL file writer that implements
//! the [`AuditLogger`](edrr_application::AuditLogger) port.

mod jsonl_audit;

pub use jsonl_audit::{AuditLogError, JsonlAuditLogger};
