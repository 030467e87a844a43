//! In-memory persistent store backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use stratum_core::{Identity, Key};
use stratum_storage::{PerKey, PersistentStore, StoreError, StoreTransaction, TransactionOptions};
use tokio::sync::RwLock;

use crate::transaction::MemoryTransaction;

/// Snapshot of a store's operation counters.
///
/// Call counts are per batched call; key counts are per key. Coherence tests
/// use these to prove the orchestrator skipped (or hit) this tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub get_calls: u64,
    pub put_calls: u64,
    pub delete_calls: u64,
    pub keys_fetched: u64,
    pub transactions_started: u64,
    pub transactions_committed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StoreCounters {
    pub(crate) get_calls: AtomicU64,
    pub(crate) put_calls: AtomicU64,
    pub(crate) delete_calls: AtomicU64,
    pub(crate) keys_fetched: AtomicU64,
    pub(crate) transactions_started: AtomicU64,
    pub(crate) transactions_committed: AtomicU64,
}

/// Shared state behind a [`MemoryStore`] and its live transactions.
#[derive(Debug)]
pub(crate) struct StoreInner {
    /// Raw record bytes, addressed by key identity.
    pub(crate) data: RwLock<HashMap<Identity, Vec<u8>>>,
    /// Allocator for ids handed to incomplete keys.
    pub(crate) id_counter: AtomicU64,
    pub(crate) counters: StoreCounters,
}

impl StoreInner {
    pub(crate) fn next_id(&self) -> u64 {
        self.id_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Completes any incomplete key with a fresh id; each key in a batch
    /// gets a distinct id.
    pub(crate) fn complete_key(&self, mut key: Key) -> Result<Key, StoreError> {
        if !key.id().is_complete() {
            key.assign_id(self.next_id())?;
        }
        if !key.is_complete() {
            // ancestors must already exist, so an incomplete parent is a
            // caller error rather than something the store can repair
            return Err(StoreError::invalid_key(format!(
                "key {key} has an incomplete ancestor"
            )));
        }
        Ok(key)
    }
}

/// In-memory persistent store.
///
/// A guarded map of raw record bytes plus an atomic id allocator. Writes in
/// a [`MemoryTransaction`] are buffered and applied under a single write
/// guard on commit, so committed batches are observed atomically.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                data: RwLock::new(HashMap::new()),
                id_counter: AtomicU64::new(1),
                counters: StoreCounters::default(),
            }),
        }
    }

    /// Snapshot of the operation counters.
    pub fn stats(&self) -> StoreStats {
        let c = &self.inner.counters;
        StoreStats {
            get_calls: c.get_calls.load(Ordering::SeqCst),
            put_calls: c.put_calls.load(Ordering::SeqCst),
            delete_calls: c.delete_calls.load(Ordering::SeqCst),
            keys_fetched: c.keys_fetched.load(Ordering::SeqCst),
            transactions_started: c.transactions_started.load(Ordering::SeqCst),
            transactions_committed: c.transactions_committed.load(Ordering::SeqCst),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.data.read().await.len()
    }

    /// Returns `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.data.read().await.is_empty()
    }

    /// Whether a record exists at the given key.
    pub async fn contains(&self, key: &Key) -> bool {
        match key.identity() {
            Ok(identity) => self.inner.data.read().await.contains_key(&identity),
            Err(_) => false,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn slot_not_found(key: &Key) -> StoreError {
    StoreError::not_found(key.kind(), key.id().to_string())
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn put_multi(
        &self,
        keys: Vec<Key>,
        values: Vec<Vec<u8>>,
    ) -> Result<Vec<Key>, StoreError> {
        if keys.len() != values.len() {
            return Err(StoreError::internal(format!(
                "put_multi: {} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        self.inner.counters.put_calls.fetch_add(1, Ordering::SeqCst);

        let mut completed = Vec::with_capacity(keys.len());
        for key in keys {
            completed.push(self.inner.complete_key(key)?);
        }

        let mut data = self.inner.data.write().await;
        for (key, value) in completed.iter().zip(values) {
            data.insert(key.identity()?, value);
        }
        Ok(completed)
    }

    async fn get_multi(&self, keys: &[Key]) -> Result<PerKey<Vec<u8>>, StoreError> {
        self.inner.counters.get_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .counters
            .keys_fetched
            .fetch_add(keys.len() as u64, Ordering::SeqCst);

        let data = self.inner.data.read().await;
        let mut slots = Vec::with_capacity(keys.len());
        for key in keys {
            let slot = match key.identity() {
                Ok(identity) => match data.get(&identity) {
                    Some(value) => Ok(value.clone()),
                    None => Err(slot_not_found(key)),
                },
                Err(err) => Err(err.into()),
            };
            slots.push(slot);
        }
        Ok(slots)
    }

    async fn delete_multi(&self, keys: &[Key]) -> Result<(), StoreError> {
        self.inner
            .counters
            .delete_calls
            .fetch_add(1, Ordering::SeqCst);

        let mut data = self.inner.data.write().await;
        for key in keys {
            // idempotent: deleting an absent key succeeds
            data.remove(&key.identity()?);
        }
        Ok(())
    }

    async fn begin_transaction(
        &self,
        options: TransactionOptions,
    ) -> Result<Box<dyn StoreTransaction>, StoreError> {
        self.inner
            .counters
            .transactions_started
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction::new(
            Arc::clone(&self.inner),
            options,
        )))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::KeyId;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = MemoryStore::new();
        let keys = vec![Key::new("Widget", "a"), Key::new("Widget", "b")];
        let values = vec![b"va".to_vec(), b"vb".to_vec()];

        let keys = store.put_multi(keys, values).await.unwrap();
        let slots = store.get_multi(&keys).await.unwrap();
        assert_eq!(slots[0].as_ref().unwrap(), &b"va".to_vec());
        assert_eq!(slots[1].as_ref().unwrap(), &b"vb".to_vec());
    }

    #[tokio::test]
    async fn test_incomplete_keys_get_distinct_ids() {
        let store = MemoryStore::new();
        let keys = vec![
            Key::incomplete("Widget"),
            Key::incomplete("Widget"),
            Key::new("Widget", "named"),
        ];
        let values = vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()];

        let keys = store.put_multi(keys, values).await.unwrap();
        assert!(keys.iter().all(Key::is_complete));
        assert_ne!(keys[0], keys[1]);
        assert_eq!(keys[2].id(), &KeyId::Name("named".into()));
    }

    #[tokio::test]
    async fn test_missing_key_is_slot_error_not_call_error() {
        let store = MemoryStore::new();
        store
            .put_multi(vec![Key::new("Widget", "here")], vec![b"v".to_vec()])
            .await
            .unwrap();

        let keys = [Key::new("Widget", "here"), Key::new("Widget", "gone")];
        let slots = store.get_multi(&keys).await.unwrap();
        assert!(slots[0].is_ok());
        assert!(slots[1].as_ref().unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let keys = vec![Key::new("Widget", "x")];
        store
            .put_multi(keys.clone(), vec![b"v".to_vec()])
            .await
            .unwrap();

        store.delete_multi(&keys).await.unwrap();
        store.delete_multi(&keys).await.unwrap();
        assert!(!store.contains(&keys[0]).await);
    }

    #[tokio::test]
    async fn test_stats_count_calls() {
        let store = MemoryStore::new();
        let keys = vec![Key::new("Widget", "x")];
        store
            .put_multi(keys.clone(), vec![b"v".to_vec()])
            .await
            .unwrap();
        store.get_multi(&keys).await.unwrap();
        store.get_multi(&keys).await.unwrap();

        let stats = store.stats();
        assert_eq!(stats.put_calls, 1);
        assert_eq!(stats.get_calls, 2);
        assert_eq!(stats.keys_fetched, 2);
    }
}
