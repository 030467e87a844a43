//! In-memory distributed cache backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use stratum_core::Identity;
use stratum_storage::{CacheError, DistributedCache};
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;

/// Options for the in-memory cache tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    /// Entry lifetime enforced by this tier. `None` keeps entries until
    /// invalidated.
    pub ttl: Option<Duration>,
}

impl CacheOptions {
    /// Sets the entry lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Snapshot of a cache's operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub get_calls: u64,
    pub set_calls: u64,
    pub delete_calls: u64,
    pub hits: u64,
}

#[derive(Debug, Default)]
struct CacheCounters {
    get_calls: AtomicU64,
    set_calls: AtomicU64,
    delete_calls: AtomicU64,
    hits: AtomicU64,
}

#[derive(Debug, Clone)]
struct CacheSlot {
    value: Vec<u8>,
    stored_at: OffsetDateTime,
}

/// In-memory stand-in for the shared distributed cache service.
///
/// Lossy on purpose: entries disappear on invalidation, [`flush`], or TTL
/// expiry. Callers must treat every hit as an optimization.
///
/// [`flush`]: MemoryCache::flush
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<Identity, CacheSlot>>,
    options: CacheOptions,
    counters: CacheCounters,
}

impl MemoryCache {
    /// Creates an empty cache with default options (no TTL).
    pub fn new() -> Self {
        Self::with_options(CacheOptions::default())
    }

    /// Creates an empty cache with the given options.
    pub fn with_options(options: CacheOptions) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            options,
            counters: CacheCounters::default(),
        }
    }

    /// Snapshot of the operation counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            get_calls: self.counters.get_calls.load(Ordering::SeqCst),
            set_calls: self.counters.set_calls.load(Ordering::SeqCst),
            delete_calls: self.counters.delete_calls.load(Ordering::SeqCst),
            hits: self.counters.hits.load(Ordering::SeqCst),
        }
    }

    /// Whether a live (non-expired) entry exists for the identity.
    pub async fn contains(&self, identity: &Identity) -> bool {
        let entries = self.entries.read().await;
        entries.get(identity).is_some_and(|slot| self.is_live(slot))
    }

    /// Drops every entry, simulating a cache service restart.
    pub async fn flush(&self) {
        self.entries.write().await.clear();
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn is_live(&self, slot: &CacheSlot) -> bool {
        match self.options.ttl {
            Some(ttl) => OffsetDateTime::now_utc() - slot.stored_at < ttl,
            None => true,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DistributedCache for MemoryCache {
    async fn get_multi(
        &self,
        identities: &[Identity],
    ) -> Result<HashMap<Identity, Vec<u8>>, CacheError> {
        self.counters.get_calls.fetch_add(1, Ordering::SeqCst);

        let entries = self.entries.read().await;
        let mut found = HashMap::new();
        for identity in identities {
            if let Some(slot) = entries.get(identity)
                && self.is_live(slot)
            {
                found.insert(identity.clone(), slot.value.clone());
            }
        }
        self.counters
            .hits
            .fetch_add(found.len() as u64, Ordering::SeqCst);
        Ok(found)
    }

    async fn set_multi(&self, items: Vec<(Identity, Vec<u8>)>) -> Result<(), CacheError> {
        self.counters.set_calls.fetch_add(1, Ordering::SeqCst);

        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.write().await;
        for (identity, value) in items {
            entries.insert(
                identity,
                CacheSlot {
                    value,
                    stored_at: now,
                },
            );
        }
        Ok(())
    }

    async fn delete_multi(&self, identities: &[Identity]) -> Result<(), CacheError> {
        self.counters.delete_calls.fetch_add(1, Ordering::SeqCst);

        let mut entries = self.entries.write().await;
        for identity in identities {
            entries.remove(identity);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::Key;

    fn identity(name: &str) -> Identity {
        Key::new("Widget", name).identity().unwrap()
    }

    #[tokio::test]
    async fn test_absent_identities_are_missing_not_errors() {
        let cache = MemoryCache::new();
        cache
            .set_multi(vec![(identity("a"), b"va".to_vec())])
            .await
            .unwrap();

        let found = cache
            .get_multi(&[identity("a"), identity("b")])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.get(&identity("a")).unwrap(), &b"va".to_vec());
        assert!(!found.contains_key(&identity("b")));
    }

    #[tokio::test]
    async fn test_delete_then_get_misses() {
        let cache = MemoryCache::new();
        cache
            .set_multi(vec![(identity("a"), b"va".to_vec())])
            .await
            .unwrap();
        cache.delete_multi(&[identity("a")]).await.unwrap();

        let found = cache.get_multi(&[identity("a")]).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_expired_entries_are_absent() {
        let cache = MemoryCache::with_options(CacheOptions::default().with_ttl(Duration::ZERO));
        cache
            .set_multi(vec![(identity("a"), b"va".to_vec())])
            .await
            .unwrap();

        let found = cache.get_multi(&[identity("a")]).await.unwrap();
        assert!(found.is_empty());
        assert!(!cache.contains(&identity("a")).await);
    }

    #[tokio::test]
    async fn test_stats_count_hits() {
        let cache = MemoryCache::new();
        cache
            .set_multi(vec![(identity("a"), b"va".to_vec())])
            .await
            .unwrap();
        cache
            .get_multi(&[identity("a"), identity("b")])
            .await
            .unwrap();

        let stats = cache.stats();
        assert_eq!(stats.get_calls, 1);
        assert_eq!(stats.set_calls, 1);
        assert_eq!(stats.hits, 1);
    }
}
