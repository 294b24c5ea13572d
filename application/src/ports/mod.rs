//! Port definitions (interfaces for external dependencies)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod agent;
pub mod audit_logger;
pub mod memory_manager;
pub mod memory_store;
pub mod phase_handler;
pub mod progress;
