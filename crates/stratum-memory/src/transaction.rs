//! Buffered transaction for the in-memory store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use stratum_core::{Identity, Key};
use stratum_storage::{PerKey, StoreError, StoreTransaction, TransactionOptions};

use crate::store::{StoreInner, slot_not_found};

#[derive(Debug, Clone)]
enum Pending {
    Put(Vec<u8>),
    Delete,
}

/// A live transaction against a [`crate::MemoryStore`].
///
/// Writes are buffered; reads see the buffer over the live base map. Commit
/// applies the whole buffer under one write guard, so other readers observe
/// either none or all of the transaction's writes.
pub struct MemoryTransaction {
    inner: Arc<StoreInner>,
    pending: HashMap<Identity, Pending>,
    _options: TransactionOptions,
}

impl MemoryTransaction {
    pub(crate) fn new(inner: Arc<StoreInner>, options: TransactionOptions) -> Self {
        Self {
            inner,
            pending: HashMap::new(),
            _options: options,
        }
    }

    /// Number of buffered writes.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn put_multi(
        &mut self,
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

        // ids are assigned eagerly so the caller can address its own writes
        // before commit
        let mut completed = Vec::with_capacity(keys.len());
        for key in keys {
            completed.push(self.inner.complete_key(key)?);
        }
        for (key, value) in completed.iter().zip(values) {
            self.pending.insert(key.identity()?, Pending::Put(value));
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
                Ok(identity) => match self.pending.get(&identity) {
                    Some(Pending::Put(value)) => Ok(value.clone()),
                    Some(Pending::Delete) => Err(slot_not_found(key)),
                    None => match data.get(&identity) {
                        Some(value) => Ok(value.clone()),
                        None => Err(slot_not_found(key)),
                    },
                },
                Err(err) => Err(err.into()),
            };
            slots.push(slot);
        }
        Ok(slots)
    }

    async fn delete_multi(&mut self, keys: &[Key]) -> Result<(), StoreError> {
        self.inner
            .counters
            .delete_calls
            .fetch_add(1, Ordering::SeqCst);
        for key in keys {
            self.pending.insert(key.identity()?, Pending::Delete);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut data = self.inner.data.write().await;
        for (identity, op) in self.pending {
            match op {
                Pending::Put(value) => {
                    data.insert(identity, value);
                }
                Pending::Delete => {
                    data.remove(&identity);
                }
            }
        }
        self.inner
            .counters
            .transactions_committed
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // nothing was applied; dropping the buffer is the rollback
        Ok(())
    }
}
