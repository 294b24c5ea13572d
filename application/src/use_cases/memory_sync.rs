//! Memory synchronization coordinator.
//!
//! Queues [`MemoryUpdate`]s and writes them through to every configured store
//! in one all-or-nothing flush:
//!
//! 1. drain the queue (`queued → flushing`)
//! 2. snapshot the touched keys in every target store
//! 3. apply the updates in queue order
//! 4. on any failure restore every store from its snapshot (`rolled_back`),
//!    otherwise `committed`
//!
//! Sync hooks receive `Some(update)` for each queued update and `None` at the
//! end of every flush.

use crate::ports::memory_manager::MemoryManager;
use crate::ports::memory_store::{MemoryStore, StoreError, StoreSnapshot};
use crate::use_cases::hooks::HookRegistry;
use async_trait::async_trait;
use edrr_domain::{MemoryKey, MemoryOperation, MemoryUpdate, StoreTarget, SyncState};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that end a flush without committing
#[derive(Error, Debug, Clone)]
pub enum MemorySyncError {
    #[error("No memory store configured; {} update(s) not persisted", updates.len())]
    NoStores { updates: Vec<MemoryUpdate> },

    #[error("Flush rolled back after {store} failed: {source}")]
    RolledBack {
        store: String,
        #[source]
        source: StoreError,
        updates: Vec<MemoryUpdate>,
    },
}

impl MemorySyncError {
    /// The drained updates, for [`MemoryManager::restore_queue`].
    pub fn into_updates(self) -> Vec<MemoryUpdate> {
        match self {
            MemorySyncError::NoStores { updates } => updates,
            MemorySyncError::RolledBack { updates, .. } => updates,
        }
    }

    /// Receipt for a flush that ended with this error.
    pub fn receipt(&self) -> FlushReceipt {
        match self {
            MemorySyncError::NoStores { .. } => FlushReceipt {
                outcome: FlushOutcome::Skipped,
                flushed: Vec::new(),
            },
            MemorySyncError::RolledBack { .. } => FlushReceipt {
                outcome: FlushOutcome::RolledBack,
                flushed: Vec::new(),
            },
        }
    }
}

/// How a flush ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushOutcome {
    Committed,
    RolledBack,
    /// No store was configured
    Skipped,
}

impl FlushOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushOutcome::Committed => "committed",
            FlushOutcome::RolledBack => "rolled_back",
            FlushOutcome::Skipped => "skipped",
        }
    }
}

/// Proof that a boundary flush was attempted.
///
/// Only the sync coordinator creates receipts; completing a cycle requires one.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushReceipt {
    outcome: FlushOutcome,
    flushed: Vec<MemoryUpdate>,
}

impl FlushReceipt {
    pub fn outcome(&self) -> FlushOutcome {
        self.outcome
    }

    pub fn flushed(&self) -> &[MemoryUpdate] {
        &self.flushed
    }

    pub fn into_flushed(self) -> Vec<MemoryUpdate> {
        self.flushed
    }
}

pub struct MemorySyncCoordinator {
    stores: Vec<Arc<dyn MemoryStore>>,
    queue: Mutex<VecDeque<MemoryUpdate>>,
    state: Mutex<SyncState>,
    hooks: HookRegistry<Option<MemoryUpdate>>,
}

impl MemorySyncCoordinator {
    pub fn new(stores: Vec<Arc<dyn MemoryStore>>) -> Self {
        Self {
            stores,
            queue: Mutex::new(VecDeque::new()),
            state: Mutex::new(SyncState::Idle),
            hooks: HookRegistry::new(),
        }
    }

    pub fn store_names(&self) -> Vec<&str> {
        self.stores.iter().map(|s| s.name()).collect()
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SyncState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Register a callback notified of queued updates and flush ends.
    pub fn register_sync_hook<F>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn(&Option<MemoryUpdate>) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.register(name, hook);
    }

    pub fn queue_update(&self, update: MemoryUpdate) {
        debug!(key = %update.key, "Queued memory update");
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(update.clone());
        self.set_state(SyncState::Queued);
        self.hooks.emit(&Some(update));
    }

    /// Take the queued updates out without flushing them.
    ///
    /// Used to keep a parent cycle's pending records out of a nested cycle's
    /// flushes; hand them back with [`MemoryManager::restore_queue`].
    pub fn take_pending(&self) -> Vec<MemoryUpdate> {
        let pending = self.drain();
        if !pending.is_empty() {
            debug!("Set aside {} pending update(s)", pending.len());
        }
        pending
    }

    fn drain(&self) -> Vec<MemoryUpdate> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Write every queued update through to the stores, all or nothing.
    pub async fn flush(&self) -> Result<FlushReceipt, MemorySyncError> {
        let updates = self.drain();

        if self.stores.is_empty() {
            if !updates.is_empty() {
                warn!("No memory store configured, dropping {} update(s)", updates.len());
            }
            self.set_state(SyncState::Idle);
            self.hooks.emit(&None);
            return Err(MemorySyncError::NoStores { updates });
        }

        self.set_state(SyncState::Flushing);
        let result = self.write_through(&updates).await;
        self.hooks.emit(&None);

        match result {
            Ok(()) => {
                self.set_state(SyncState::Committed);
                info!("Flushed {} memory update(s)", updates.len());
                Ok(FlushReceipt {
                    outcome: FlushOutcome::Committed,
                    flushed: updates,
                })
            }
            Err((store, source)) => {
                self.set_state(SyncState::RolledBack);
                warn!("Memory flush rolled back: {} failed: {}", store, source);
                Err(MemorySyncError::RolledBack {
                    store,
                    source,
                    updates,
                })
            }
        }
    }

    async fn write_through(&self, updates: &[MemoryUpdate]) -> Result<(), (String, StoreError)> {
        for update in updates {
            if let StoreTarget::Named(name) = &update.target
                && !self.stores.iter().any(|s| s.name() == name)
            {
                warn!(key = %update.key, "No store named {}, update skipped", name);
            }
        }

        let mut snapshots: Vec<(Arc<dyn MemoryStore>, StoreSnapshot)> = Vec::new();
        for store in &self.stores {
            let keys = touched_keys(store.name(), updates);
            if keys.is_empty() {
                continue;
            }
            match store.snapshot(&keys).await {
                Ok(snapshot) => snapshots.push((Arc::clone(store), snapshot)),
                Err(e) => {
                    self.rollback(snapshots).await;
                    return Err((store.name().to_string(), e));
                }
            }
        }

        for update in updates {
            for store in &self.stores {
                if !update.target.includes(store.name()) {
                    continue;
                }
                let applied = match &update.operation {
                    MemoryOperation::Put(value) => store.write(&update.key, value.clone()).await,
                    MemoryOperation::Remove => store.remove(&update.key).await,
                };
                if let Err(e) = applied {
                    self.rollback(snapshots).await;
                    return Err((store.name().to_string(), e));
                }
            }
        }

        Ok(())
    }

    async fn rollback(&self, snapshots: Vec<(Arc<dyn MemoryStore>, StoreSnapshot)>) {
        for (store, snapshot) in snapshots.into_iter().rev() {
            if let Err(e) = store.restore(snapshot).await {
                error!("Failed to restore store {}: {}", store.name(), e);
            }
        }
    }
}

fn touched_keys(store: &str, updates: &[MemoryUpdate]) -> Vec<MemoryKey> {
    let mut keys: Vec<MemoryKey> = Vec::new();
    for update in updates.iter().filter(|u| u.target.includes(store)) {
        if !keys.contains(&update.key) {
            keys.push(update.key.clone());
        }
    }
    keys
}

#[async_trait]
impl MemoryManager for MemorySyncCoordinator {
    fn write(&self, key: MemoryKey, value: Value) {
        self.queue_update(MemoryUpdate::put(StoreTarget::All, key, value));
    }

    async fn read(&self, key: &MemoryKey) -> Option<Value> {
        let queued = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|u| &u.key == key)
            .map(|u| u.payload().cloned());
        if let Some(latest) = queued {
            return latest;
        }

        for store in &self.stores {
            match store.read(key).await {
                Ok(Some(value)) => return Some(value),
                Ok(None) => {}
                Err(e) => warn!("Read of {} from {} failed: {}", key, store.name(), e),
            }
        }
        None
    }

    async fn flush_queue(&self) -> Vec<MemoryUpdate> {
        match self.flush().await {
            Ok(receipt) => receipt.into_flushed(),
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }

    fn restore_queue(&self, updates: Vec<MemoryUpdate>) {
        if updates.is_empty() {
            return;
        }
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        for update in updates.into_iter().rev() {
            queue.push_front(update);
        }
        drop(queue);
        self.set_state(SyncState::Queued);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edrr_domain::{Phase, RecordKind};
    use serde_json::json;
    use std::collections::BTreeMap;

    /// Store backed by a map; optionally fails every write to one key.
    struct MapStore {
        name: String,
        data: Mutex<BTreeMap<MemoryKey, Value>>,
        fail_on: Option<MemoryKey>,
    }

    impl MapStore {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                data: Mutex::new(BTreeMap::new()),
                fail_on: None,
            })
        }

        fn failing(name: &str, key: MemoryKey) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                data: Mutex::new(BTreeMap::new()),
                fail_on: Some(key),
            })
        }

        fn get(&self, key: &MemoryKey) -> Option<Value> {
            self.data.lock().unwrap().get(key).cloned()
        }

        fn seed(&self, key: MemoryKey, value: Value) {
            self.data.lock().unwrap().insert(key, value);
        }
    }

    #[async_trait]
    impl MemoryStore for MapStore {
        fn name(&self) -> &str {
            &self.name
        }

        async fn read(&self, key: &MemoryKey) -> Result<Option<Value>, StoreError> {
            Ok(self.get(key))
        }

        async fn write(&self, key: &MemoryKey, value: Value) -> Result<(), StoreError> {
            if self.fail_on.as_ref() == Some(key) {
                return Err(StoreError::Unavailable {
                    store: self.name.clone(),
                    reason: "injected".into(),
                });
            }
            self.data.lock().unwrap().insert(key.clone(), value);
            Ok(())
        }

        async fn remove(&self, key: &MemoryKey) -> Result<(), StoreError> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn key(subject: &str) -> MemoryKey {
        MemoryKey::in_phase(Phase::Expand, subject, RecordKind::PhaseResult)
    }

    #[tokio::test]
    async fn test_flush_commits_to_all_stores() {
        let a = MapStore::new("vector");
        let b = MapStore::new("graph");
        let sync = MemorySyncCoordinator::new(vec![a.clone(), b.clone()]);

        sync.write(key("k1"), json!(1));
        assert_eq!(sync.state(), SyncState::Queued);
        let receipt = sync.flush().await.unwrap();

        assert_eq!(receipt.outcome(), FlushOutcome::Committed);
        assert_eq!(receipt.flushed().len(), 1);
        assert_eq!(a.get(&key("k1")), Some(json!(1)));
        assert_eq!(b.get(&key("k1")), Some(json!(1)));
        assert_eq!(sync.state(), SyncState::Committed);
        assert_eq!(sync.pending(), 0);
    }

    #[tokio::test]
    async fn test_failure_restores_every_store() {
        let a = MapStore::new("vector");
        let b = MapStore::failing("graph", key("k2"));
        let c = MapStore::new("document");
        for store in [&a, &b, &c] {
            store.seed(key("k1"), json!("old"));
        }
        let sync = MemorySyncCoordinator::new(vec![a.clone(), b.clone(), c.clone()]);

        sync.write(key("k1"), json!("new"));
        sync.write(key("k2"), json!("new"));
        let err = sync.flush().await.unwrap_err();

        assert!(matches!(err, MemorySyncError::RolledBack { ref store, .. } if store == "graph"));
        assert_eq!(err.receipt().outcome(), FlushOutcome::RolledBack);
        assert_eq!(sync.state(), SyncState::RolledBack);
        for store in [&a, &b, &c] {
            assert_eq!(store.get(&key("k1")), Some(json!("old")), "{}", store.name);
            assert_eq!(store.get(&key("k2")), None, "{}", store.name);
        }
        assert_eq!(err.into_updates().len(), 2);
    }

    #[tokio::test]
    async fn test_named_target_only_touches_that_store() {
        let a = MapStore::new("vector");
        let b = MapStore::new("graph");
        let sync = MemorySyncCoordinator::new(vec![a.clone(), b.clone()]);

        sync.queue_update(MemoryUpdate::put(
            StoreTarget::Named("graph".into()),
            key("k"),
            json!(true),
        ));
        sync.flush().await.unwrap();
        assert_eq!(a.get(&key("k")), None);
        assert_eq!(b.get(&key("k")), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_no_stores_signals_none() {
        let sync = MemorySyncCoordinator::new(vec![]);
        let signals = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&signals);
        sync.register_sync_hook("recorder", move |update: &Option<MemoryUpdate>| {
            seen.lock().unwrap().push(update.is_some());
            Ok(())
        });

        sync.write(key("k"), json!(1));
        let err = sync.flush().await.unwrap_err();

        assert_eq!(err.receipt().outcome(), FlushOutcome::Skipped);
        assert_eq!(*signals.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_restore_queue_keeps_order() {
        let store = MapStore::failing("graph", key("bad"));
        let sync = MemorySyncCoordinator::new(vec![store.clone()]);
        sync.write(key("a"), json!(1));
        sync.write(key("bad"), json!(2));

        assert!(sync.flush_queue().await.is_empty());
        // Nothing was lost from the store's point of view.
        assert_eq!(store.get(&key("a")), None);

        sync.restore_queue(vec![
            MemoryUpdate::put(StoreTarget::All, key("a"), json!(1)),
            MemoryUpdate::put(StoreTarget::All, key("b"), json!(3)),
        ]);
        sync.write(key("c"), json!(4));
        let flushed = sync.flush_queue().await;
        let subjects: Vec<_> = flushed.iter().map(|u| u.key.subject.as_str()).collect();
        assert_eq!(subjects, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_pending_updates_survive_a_nested_rollback() {
        let store = MapStore::failing("graph", key("child"));
        let sync = MemorySyncCoordinator::new(vec![store.clone()]);

        sync.write(key("parent"), json!(1));
        let parked = sync.take_pending();
        assert_eq!(sync.pending(), 0);

        sync.write(key("child"), json!(2));
        assert!(sync.flush().await.is_err());

        sync.restore_queue(parked);
        let receipt = sync.flush().await.unwrap();
        assert_eq!(receipt.flushed().len(), 1);
        assert_eq!(store.get(&key("parent")), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_read_sees_queued_writes_first() {
        let store = MapStore::new("vector");
        store.seed(key("k"), json!("persisted"));
        let sync = MemorySyncCoordinator::new(vec![store.clone()]);

        assert_eq!(sync.read(&key("k")).await, Some(json!("persisted")));
        sync.write(key("k"), json!("queued"));
        assert_eq!(sync.read(&key("k")).await, Some(json!("queued")));
        assert_eq!(sync.read(&key("missing")).await, None);
    }
}
