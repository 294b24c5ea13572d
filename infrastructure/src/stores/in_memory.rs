//! In-memory memory store.
//!
//! Stands in for the vector, graph, document and structured backends. Each
//! instance is labelled with the [`StoreKind`] it replaces; the label is also
//! the store name used by named update targets.

use async_trait::async_trait;
use edrr_application::{MemoryStore, StoreError};
use edrr_domain::MemoryKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// The persistence backend an [`InMemoryStore`] stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Vector,
    Graph,
    Document,
    Structured,
}

impl StoreKind {
    pub const ALL: [StoreKind; 4] = [
        StoreKind::Vector,
        StoreKind::Graph,
        StoreKind::Document,
        StoreKind::Structured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Vector => "vector",
            StoreKind::Graph => "graph",
            StoreKind::Document => "document",
            StoreKind::Structured => "structured",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.to_lowercase())
            .ok_or_else(|| {
                format!("Unknown store kind: {s}. Valid: vector, graph, document, structured")
            })
    }
}

/// Map-backed store. Cloning shares the underlying data.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    kind: StoreKind,
    records: Arc<RwLock<BTreeMap<MemoryKey, Value>>>,
    available: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new(kind: StoreKind) -> Self {
        Self {
            kind,
            records: Arc::new(RwLock::new(BTreeMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// One store of every kind, in [`StoreKind::ALL`] order.
    pub fn standard_set() -> Vec<InMemoryStore> {
        StoreKind::ALL.into_iter().map(Self::new).collect()
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Simulate an outage: while unavailable, writes and removals fail.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Copy of every record, in key order.
    pub async fn entries(&self) -> Vec<(MemoryKey, Value)> {
        self.records
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                store: self.kind.to_string(),
                reason: "store is offline".to_string(),
            })
        }
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn read(&self, key: &MemoryKey) -> Result<Option<Value>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn write(&self, key: &MemoryKey, value: Value) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.records.write().await.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &MemoryKey) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.records.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edrr_domain::{Phase, RecordKind};
    use serde_json::json;

    fn key(subject: &str) -> MemoryKey {
        MemoryKey::in_phase(Phase::Expand, subject, RecordKind::PhaseResult)
    }

    #[tokio::test]
    async fn test_write_read_remove() {
        let store = InMemoryStore::new(StoreKind::Graph);
        store.write(&key("a"), json!({"x": 1})).await.unwrap();
        assert_eq!(store.read(&key("a")).await.unwrap(), Some(json!({"x": 1})));
        assert_eq!(store.len().await, 1);

        store.remove(&key("a")).await.unwrap();
        assert!(store.read(&key("a")).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_and_restore_use_the_default_methods() {
        let store = InMemoryStore::new(StoreKind::Document);
        store.write(&key("kept"), json!(1)).await.unwrap();

        let snapshot = store.snapshot(&[key("kept"), key("new")]).await.unwrap();
        store.write(&key("kept"), json!(2)).await.unwrap();
        store.write(&key("new"), json!(3)).await.unwrap();
        store.restore(snapshot).await.unwrap();

        assert_eq!(store.entries().await, vec![(key("kept"), json!(1))]);
    }

    #[tokio::test]
    async fn test_offline_store_rejects_writes() {
        let store = InMemoryStore::new(StoreKind::Vector);
        store.set_available(false);
        let err = store.write(&key("a"), json!(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { ref store, .. } if store == "vector"));

        store.set_available(true);
        assert!(store.write(&key("a"), json!(1)).await.is_ok());
    }

    #[test]
    fn test_store_kind_names() {
        let names: Vec<_> = InMemoryStore::standard_set()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["vector", "graph", "document", "structured"]);
        assert_eq!("Graph".parse::<StoreKind>(), Ok(StoreKind::Graph));
        assert!("columnar".parse::<StoreKind>().is_err());
    }
}
