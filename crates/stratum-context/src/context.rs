//! The per-request coherence context.
//!
//! A [`Context`] sequences every operation across the three tiers: the
//! request-private local map, the shared distributed cache, and the
//! authoritative persistent store. Reads fall through local → distributed →
//! store and back-fill the faster tiers on the way back; writes invalidate
//! the distributed tier before the store commits so no reader is served a
//! stale cached value once the update begins.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use stratum_core::{Entity, Identity, Key, KeyId, Record, codec};
use stratum_storage::{
    DynCache, DynStore, MultiError, StoreError, StoreTransaction, TransactionOptions,
};

use crate::error::{CoherenceError, Result};
use crate::local::LocalCache;

/// Policy knobs for a context.
#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    /// Cache not-found envelopes into the distributed tier so repeated
    /// misses against the same absent key skip the persistent store.
    pub cache_not_found: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            cache_not_found: true,
        }
    }
}

/// Per-context tier counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Keys served from the local tier.
    pub local_hits: u64,
    /// Keys served from the distributed tier.
    pub distributed_hits: u64,
    /// Keys fetched from the persistent store.
    pub store_fetches: u64,
    /// Keys answered from a cached not-found envelope.
    pub negative_hits: u64,
}

/// Staging state for a live transaction. Exists only while the context is
/// transactional; the outer context's local tier is touched only after
/// commit, through these maps.
struct TxnState {
    store_txn: Box<dyn StoreTransaction>,
    to_set: HashMap<Identity, Vec<u8>>,
    to_delete: HashSet<Identity>,
}

/// Request-scoped coherence orchestrator over the three tiers.
///
/// Construct one per inbound request and pass it by `&mut` reference; a
/// context is never shared across requests, so its local tier needs no
/// locking. The store and cache behind it are shared services.
///
/// ```ignore
/// let mut ctx = Context::new(store, cache);
/// let mut entity = Entity::new(Key::incomplete_of::<Widget>(), widget);
/// ctx.put(&mut entity).await?;
/// let fetched = ctx.key_get::<Widget>(entity.key.clone()).await?;
/// ```
pub struct Context {
    store: DynStore,
    cache: DynCache,
    local: LocalCache,
    txn: Option<TxnState>,
    options: ContextOptions,
    stats: ContextStats,
}

impl Context {
    /// Creates a context with default options.
    pub fn new(store: DynStore, cache: DynCache) -> Self {
        Self::with_options(store, cache, ContextOptions::default())
    }

    /// Creates a context with the given options.
    pub fn with_options(store: DynStore, cache: DynCache, options: ContextOptions) -> Self {
        Self {
            store,
            cache,
            local: LocalCache::new(),
            txn: None,
            options,
            stats: ContextStats::default(),
        }
    }

    /// Whether this context is bound to a live transaction.
    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    /// Snapshot of this context's tier counters.
    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    /// Drops every local-tier entry.
    pub fn clear_local(&mut self) {
        self.local.clear();
    }

    /// Number of envelopes in the local tier.
    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    // ==================== Put ====================

    /// Stores a single entity. See [`put_multi`](Self::put_multi).
    pub async fn put<T: Record>(&mut self, entity: &mut Entity<T>) -> Result<()> {
        self.put_multi(std::slice::from_mut(entity)).await
    }

    /// Stores a batch of entities.
    ///
    /// Entities with incomplete keys get a store-assigned key, written back
    /// onto the entity. Identities of already-complete keys are invalidated
    /// from the distributed tier before the store is touched, so no other
    /// reader observes a stale cached value once the update begins.
    ///
    /// Outside a transaction the stored envelopes land in the local tier
    /// immediately; inside one they are staged and merged into the outer
    /// context only after commit.
    ///
    /// # Errors
    ///
    /// Fails fast with [`CoherenceError::Core`] when an entity carries no
    /// source value; store failures propagate unchanged. Distributed-tier
    /// invalidation failures are logged and tolerated — the store remains
    /// authoritative.
    pub async fn put_multi<T: Record>(&mut self, entities: &mut [Entity<T>]) -> Result<()> {
        // encode up front: a missing src or codec failure must abort before
        // any tier is touched
        let mut values = Vec::with_capacity(entities.len());
        for entity in entities.iter() {
            values.push(codec::encode_src(entity.require_src()?)?);
        }

        let mut stale = Vec::new();
        for entity in entities.iter() {
            if entity.key.is_complete() {
                stale.push(entity.identity()?);
            }
        }
        self.invalidate_distributed(&stale).await;

        let keys: Vec<Key> = entities.iter().map(|e| e.key.clone()).collect();
        let keys = match &mut self.txn {
            Some(txn) => txn.store_txn.put_multi(keys, values).await?,
            None => self.store.put_multi(keys, values).await?,
        };

        for (entity, key) in entities.iter_mut().zip(keys) {
            entity.key = key;
            entity.not_found = false;
            let identity = entity.identity()?;
            let encoded = codec::encode_entity(entity)?;
            match &mut self.txn {
                Some(txn) => {
                    txn.to_delete.remove(&identity);
                    txn.to_set.insert(identity, encoded);
                }
                None => self.local.put(identity, encoded),
            }
        }
        Ok(())
    }

    // ==================== Get ====================

    /// Fetches a record of type `T` by id. See [`get_multi`](Self::get_multi).
    pub async fn get<T: Record>(&mut self, id: impl Into<KeyId>) -> Result<Entity<T>> {
        self.key_get(Key::of::<T>(id)).await
    }

    /// Fetches a record of type `T` by id under an ancestor key.
    pub async fn get_child<T: Record>(
        &mut self,
        id: impl Into<KeyId>,
        parent: Key,
    ) -> Result<Entity<T>> {
        self.key_get(Key::of::<T>(id).with_parent(parent)).await
    }

    /// Fetches a record by a fully constructed key.
    ///
    /// # Errors
    ///
    /// A missing record surfaces as [`StoreError::NotFound`], unwrapped from
    /// its batch slot.
    pub async fn key_get<T: Record>(&mut self, key: Key) -> Result<Entity<T>> {
        let mut entities = [Entity::lookup(key)];
        match self.get_multi(&mut entities).await {
            Ok(()) => {}
            Err(CoherenceError::Partial(merr)) => {
                // single-key convenience: hand back the slot error itself
                let err = merr
                    .into_slots()
                    .pop()
                    .flatten()
                    .unwrap_or_else(|| StoreError::internal("empty batch error"));
                return Err(err.into());
            }
            Err(err) => return Err(err),
        }
        let [entity] = entities;
        Ok(entity)
    }

    /// Fetches a batch of records, whose keys must already be complete.
    ///
    /// Outside a transaction, keys are served from the local tier when
    /// present, then batched against the distributed tier, and only the
    /// remaining misses reach the persistent store — in one call. Freshly
    /// fetched envelopes back-fill both faster tiers (not-found ones too,
    /// under [`ContextOptions::cache_not_found`]).
    ///
    /// Inside a transaction both cache tiers are bypassed entirely:
    /// transactional reads must observe the authoritative state at the
    /// moment of the transaction, not a cache that may predate or race it.
    ///
    /// # Errors
    ///
    /// Keys absent from the store mark their entity `not_found` and produce
    /// [`CoherenceError::Partial`] with a [`StoreError::NotFound`] in exactly
    /// those slots; the other slots still carry valid data. Distributed-tier
    /// *read* failures and store call-level failures abort the whole call.
    pub async fn get_multi<T: Record>(&mut self, entities: &mut [Entity<T>]) -> Result<()> {
        // slots that still need the persistent tier
        let mut store_ixs: Vec<usize> = Vec::new();

        if self.txn.is_none() {
            let mut miss_identities: Vec<Identity> = Vec::new();
            let mut miss_ixs: Vec<usize> = Vec::new();

            for (i, entity) in entities.iter_mut().enumerate() {
                let identity = entity.identity()?;
                if let Some(bytes) = self.local.get(&identity) {
                    entity.absorb(codec::decode_entity(bytes)?);
                    self.stats.local_hits += 1;
                    if entity.not_found {
                        self.stats.negative_hits += 1;
                    }
                    debug!(key = %entity.key, "local tier hit");
                } else {
                    miss_identities.push(identity);
                    miss_ixs.push(i);
                }
            }

            if !miss_identities.is_empty() {
                // a failed distributed read is a hard error: fall-through
                // correctness depends on knowing what the shared tier holds
                let mut found = self.cache.get_multi(&miss_identities).await?;
                for (identity, &i) in miss_identities.iter().zip(&miss_ixs) {
                    if let Some(bytes) = found.remove(identity) {
                        let entity = &mut entities[i];
                        entity.absorb(codec::decode_entity(&bytes)?);
                        self.stats.distributed_hits += 1;
                        if entity.not_found {
                            self.stats.negative_hits += 1;
                        }
                        debug!(key = %entity.key, "distributed tier hit");
                        self.local.put(identity.clone(), bytes);
                    } else {
                        store_ixs.push(i);
                    }
                }
            }
        } else {
            // fail fast on incomplete keys before the store call
            for entity in entities.iter() {
                entity.identity()?;
            }
            store_ixs = (0..entities.len()).collect();
        }

        if !store_ixs.is_empty() {
            let keys: Vec<Key> = store_ixs.iter().map(|&i| entities[i].key.clone()).collect();
            let slots = match &self.txn {
                Some(txn) => txn.store_txn.get_multi(&keys).await?,
                None => self.store.get_multi(&keys).await?,
            };
            self.stats.store_fetches += keys.len() as u64;

            let mut to_distributed: Vec<(Identity, Vec<u8>)> = Vec::new();
            for (&i, slot) in store_ixs.iter().zip(slots) {
                let entity = &mut entities[i];
                match slot {
                    Ok(bytes) => {
                        entity.src = Some(codec::decode_src(&bytes)?);
                        entity.not_found = false;
                    }
                    Err(err) if err.is_not_found() => entity.mark_not_found(),
                    Err(err) => return Err(err.into()),
                }

                if self.txn.is_none() {
                    let identity = entity.identity()?;
                    let encoded = codec::encode_entity(entity)?;
                    if !entity.not_found || self.options.cache_not_found {
                        to_distributed.push((identity.clone(), encoded.clone()));
                    }
                    self.local.put(identity, encoded);
                }
            }

            if !to_distributed.is_empty() {
                if let Err(err) = self.cache.set_multi(to_distributed).await {
                    warn!(
                        backend = self.cache.backend_name(),
                        error = %err,
                        "distributed cache back-fill failed; continuing"
                    );
                }
            }
        }

        let mut merr = MultiError::new(entities.len());
        for (i, entity) in entities.iter().enumerate() {
            if entity.not_found {
                merr.set(
                    i,
                    StoreError::not_found(entity.key.kind(), entity.key.id().to_string()),
                );
            }
        }
        if merr.any() {
            return Err(merr.into());
        }
        Ok(())
    }

    // ==================== Delete ====================

    /// Deletes a single record. See [`delete_multi`](Self::delete_multi).
    pub async fn delete(&mut self, key: &Key) -> Result<()> {
        self.delete_multi(std::slice::from_ref(key)).await
    }

    /// Deletes a batch of records, whose keys must be complete.
    ///
    /// The distributed tier is invalidated before the store delete, with the
    /// same tolerated-failure policy as [`put_multi`](Self::put_multi).
    /// Inside a transaction the identities are staged and evicted from the
    /// outer context's local tier only after commit.
    pub async fn delete_multi(&mut self, keys: &[Key]) -> Result<()> {
        let mut identities = Vec::with_capacity(keys.len());
        for key in keys {
            identities.push(key.identity()?);
        }
        self.invalidate_distributed(&identities).await;

        match &mut self.txn {
            Some(txn) => {
                txn.store_txn.delete_multi(keys).await?;
                for identity in identities {
                    txn.to_set.remove(&identity);
                    txn.to_delete.insert(identity);
                }
            }
            None => {
                self.store.delete_multi(keys).await?;
                for identity in &identities {
                    self.local.delete(identity);
                }
            }
        }
        Ok(())
    }

    // ==================== Transactions ====================

    /// Runs `f` inside a persistent-store transaction.
    ///
    /// `f` receives a fresh transactional context sharing no local tier with
    /// this one; every `put`/`get`/`delete` through it follows the
    /// transactional paths (cache tiers bypassed, writes staged). On a
    /// successful commit the staged envelopes are merged into this context's
    /// local tier and staged deletes evicted from it. On any failure — `f`
    /// erroring or the commit failing — the transaction is rolled back and
    /// this context's local tier is left untouched.
    ///
    /// The distributed tier is deliberately not repopulated after commit;
    /// other readers converge through their own read paths or the tier's
    /// TTL. That eventual consistency is part of the contract.
    ///
    /// # Errors
    ///
    /// `f`'s error is propagated verbatim. Nested transactions are refused
    /// with [`StoreError::Transaction`].
    pub async fn run_in_transaction<F>(&mut self, options: TransactionOptions, f: F) -> Result<()>
    where
        F: for<'a> FnOnce(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send,
    {
        if self.txn.is_some() {
            return Err(StoreError::transaction("already in a transaction").into());
        }

        let store_txn = self.store.begin_transaction(options).await?;
        let mut inner = Context {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            local: LocalCache::new(),
            txn: Some(TxnState {
                store_txn,
                to_set: HashMap::new(),
                to_delete: HashSet::new(),
            }),
            options: self.options,
            stats: ContextStats::default(),
        };

        let outcome = f(&mut inner).await;

        let Some(txn) = inner.txn.take() else {
            return Err(StoreError::transaction("transactional context lost its transaction").into());
        };

        match outcome {
            Ok(()) => {
                txn.store_txn.commit().await?;
                // only now does the outer view learn what was committed
                for (identity, encoded) in txn.to_set {
                    self.local.put(identity, encoded);
                }
                for identity in &txn.to_delete {
                    self.local.delete(identity);
                }
                Ok(())
            }
            Err(err) => {
                if let Err(rb_err) = txn.store_txn.rollback().await {
                    warn!(error = %rb_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    // ==================== Internal ====================

    /// Best-effort invalidation of the distributed tier. Failures are logged
    /// and swallowed: the store stays authoritative and the worst case is a
    /// TTL-bounded stale window, while aborting the write here would lose
    /// the caller's update.
    async fn invalidate_distributed(&self, identities: &[Identity]) {
        if identities.is_empty() {
            return;
        }
        if let Err(err) = self.cache.delete_multi(identities).await {
            warn!(
                backend = self.cache.backend_name(),
                keys = identities.len(),
                error = %err,
                "distributed cache invalidation failed; store remains authoritative"
            );
        }
    }
}
