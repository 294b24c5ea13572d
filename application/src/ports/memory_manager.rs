//! Memory manager port
//!
//! The queue-facing side of memory synchronization, as seen by the
//! coordinator and the consensus engine.

use async_trait::async_trait;
use edrr_domain::{MemoryKey, MemoryUpdate};
use serde_json::Value;

#[async_trait]
pub trait MemoryManager: Send + Sync {
    /// Queue a write to every store; nothing is persisted until the next flush.
    fn write(&self, key: MemoryKey, value: Value);

    /// Read a value, seeing queued writes before persisted ones.
    async fn read(&self, key: &MemoryKey) -> Option<Value>;

    /// Flush the queue. Returns the updates that were committed (empty when
    /// the flush rolled back or there was nothing to do).
    async fn flush_queue(&self) -> Vec<MemoryUpdate>;

    /// Put updates back at the front of the queue, keeping their order.
    fn restore_queue(&self, updates: Vec<MemoryUpdate>);
}
