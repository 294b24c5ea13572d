//! Infrastructure layer for the EDRR orchestrator
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod agents;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod stores;

// Re-export commonly used types
pub use agents::KeywordAgent;
pub use config::{
    ConfigLoader, FileAgentEntry, FileConfig, FileConsensusConfig, FileLimitsConfig,
    FileLoggingConfig, FileOutputConfig, FileRecursionConfig,
};
pub use handlers::TaskPhaseHandler;
pub use logging::{AuditLogError, JsonlAuditLogger};
pub use stores::{InMemoryStore, StoreKind};
