//! Backend traits for the two external tiers.
//!
//! The orchestrator only ever talks to the authoritative store and the
//! shared cache through these seams; wire protocols and client libraries
//! live behind them. Implementations must be thread-safe (`Send + Sync`) —
//! both tiers are shared across all request contexts.

use std::collections::HashMap;

use async_trait::async_trait;
use stratum_core::{Identity, Key};

use crate::error::{CacheError, StoreError};
use crate::types::{PerKey, TransactionOptions};

/// The authoritative persistent key-value store.
///
/// All operations are batched; backends amortize network latency per call,
/// not per key. Result ordering always matches input ordering.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Stores a batch of raw values.
    ///
    /// Incomplete keys get a store-assigned id; the returned keys are the
    /// (possibly newly completed) input keys, in input order. The call is
    /// atomic from the caller's point of view.
    ///
    /// # Errors
    ///
    /// Returns a call-level error when the batch could not be applied; no
    /// per-key partial success is reported for puts.
    async fn put_multi(
        &self,
        keys: Vec<Key>,
        values: Vec<Vec<u8>>,
    ) -> Result<Vec<Key>, StoreError>;

    /// Fetches a batch of raw values.
    ///
    /// Every input key gets a slot in the result, in input order. A missing
    /// record is `Err(StoreError::NotFound)` in its slot — never a
    /// call-level failure — so other keys in the batch still succeed.
    ///
    /// # Errors
    ///
    /// Returns a call-level error only for transport failures.
    async fn get_multi(&self, keys: &[Key]) -> Result<PerKey<Vec<u8>>, StoreError>;

    /// Deletes a batch of records. Deleting an absent key is idempotent.
    async fn delete_multi(&self, keys: &[Key]) -> Result<(), StoreError>;

    /// Begins a native store transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Transaction` if a transaction cannot be started.
    async fn begin_transaction(
        &self,
        options: TransactionOptions,
    ) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// A live persistent-store transaction.
///
/// Writes are isolated until `commit`; reads observe the authoritative state
/// at the moment of the transaction plus the transaction's own writes. The
/// transaction must be either committed or rolled back.
#[async_trait]
pub trait StoreTransaction: Send + Sync {
    /// Stores a batch of raw values within this transaction.
    ///
    /// See [`PersistentStore::put_multi`]; id assignment for incomplete keys
    /// happens eagerly so callers can address the records they just wrote.
    async fn put_multi(&mut self, keys: Vec<Key>, values: Vec<Vec<u8>>)
    -> Result<Vec<Key>, StoreError>;

    /// Fetches a batch of raw values through this transaction's view.
    async fn get_multi(&self, keys: &[Key]) -> Result<PerKey<Vec<u8>>, StoreError>;

    /// Deletes a batch of records within this transaction.
    async fn delete_multi(&mut self, keys: &[Key]) -> Result<(), StoreError>;

    /// Atomically applies all writes. Consumes the transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Transaction` if the commit fails; no writes are
    /// applied in that case.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards all writes. Consumes the transaction.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// The shared distributed cache tier.
///
/// Lossy by contract: any entry may vanish at any time, so every operation
/// here is an optimization, never a source of truth.
#[async_trait]
pub trait DistributedCache: Send + Sync {
    /// Fetches the values present for the given identities.
    ///
    /// Absent identities are simply missing from the result map — not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures; callers must not treat a
    /// failed get as "absent everywhere".
    async fn get_multi(
        &self,
        identities: &[Identity],
    ) -> Result<HashMap<Identity, Vec<u8>>, CacheError>;

    /// Best-effort upsert of a batch of encoded envelopes.
    ///
    /// Partial failure on some keys does not invalidate the rest.
    async fn set_multi(&self, items: Vec<(Identity, Vec<u8>)>) -> Result<(), CacheError>;

    /// Best-effort invalidation, issued before every authoritative write so
    /// stale values are never served mid-update.
    async fn delete_multi(&self, identities: &[Identity]) -> Result<(), CacheError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
