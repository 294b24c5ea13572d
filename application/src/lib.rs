//! Application layer for the EDRR orchestrator
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ConsensusSettings, EdrrConfig, MAX_RECURSION_DEPTH, RecursionConfig};
pub use ports::{
    agent::{Agent, AgentError},
    audit_logger::{AuditEvent, AuditLogger, NoAuditLogger},
    memory_manager::MemoryManager,
    memory_store::{MemoryStore, StoreError, StoreSnapshot},
    phase_handler::{PhaseHandler, PhaseHandlerError},
    progress::{NoProgress, ProgressNotifier},
};
pub use use_cases::consensus::ConsensusEngine;
pub use use_cases::context_merge::{ContextMergeEngine, MergeError};
pub use use_cases::hooks::{HookError, HookRegistry};
pub use use_cases::memory_sync::{
    FlushOutcome, FlushReceipt, MemorySyncCoordinator, MemorySyncError,
};
pub use use_cases::phase_gate::{GateFailure, GateVerdict, PhaseGate, Recovery};
pub use use_cases::phase_machine::{PhaseError, PhaseMachine};
pub use use_cases::recursion::{
    RecursionError, RecursionManager, SpawnEnvironment, SpawnOutcome,
};
pub use use_cases::registry::CycleRegistry;
pub use use_cases::run_cycle::{
    CoordinatorError, CycleEvent, CycleReport, CycleSummary, DeclinedSpawn, EdrrCoordinator,
    SyncRecord,
};
