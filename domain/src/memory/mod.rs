//! Memory domain

pub mod entities;

pub use entities::{MemoryKey, MemoryOperation, MemoryUpdate, RecordKind, StoreTarget, SyncState};
