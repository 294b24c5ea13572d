//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod consensus;
pub mod context_merge;
pub mod hooks;
pub mod memory_sync;
pub mod phase_gate;
pub mod phase_machine;
pub mod recursion;
pub mod registry;
pub mod run_cycle;
