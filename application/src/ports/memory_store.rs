//! Memory store port
//!
//! One implementation per persistence backend (vector, graph, document,
//! structured). The sync coordinator drives stores through this trait and
//! relies on `snapshot` / `restore` for all-or-nothing flushes.

use async_trait::async_trait;
use edrr_domain::MemoryKey;
use serde_json::Value;
use thiserror::Error;

/// Errors reported by a memory store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store {store} unavailable: {reason}")]
    Unavailable { store: String, reason: String },

    #[error("Store {store} rejected {key}: {reason}")]
    Rejected {
        store: String,
        key: String,
        reason: String,
    },
}

/// Prior values of a set of keys, taken before a flush.
///
/// `None` means the key was absent and must be removed again on restore.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub entries: Vec<(MemoryKey, Option<Value>)>,
}

/// A persistence backend
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Name used by [`edrr_domain::StoreTarget::Named`].
    fn name(&self) -> &str;

    async fn read(&self, key: &MemoryKey) -> Result<Option<Value>, StoreError>;

    async fn write(&self, key: &MemoryKey, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, key: &MemoryKey) -> Result<(), StoreError>;

    /// Capture the current values of `keys`.
    async fn snapshot(&self, keys: &[MemoryKey]) -> Result<StoreSnapshot, StoreError> {
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            entries.push((key.clone(), self.read(key).await?));
        }
        Ok(StoreSnapshot { entries })
    }

    /// Put every key back to its snapshotted value.
    async fn restore(&self, snapshot: StoreSnapshot) -> Result<(), StoreError> {
        for (key, value) in snapshot.entries {
            match value {
                Some(value) => self.write(&key, value).await?,
                None => self.remove(&key).await?,
            }
        }
        Ok(())
    }
}
