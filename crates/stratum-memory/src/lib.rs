//! # stratum-memory
//!
//! In-memory implementations of the `stratum-storage` backend traits.
//!
//! [`MemoryStore`] is a [`stratum_storage::PersistentStore`] with buffered
//! transactions; [`MemoryCache`] is a [`stratum_storage::DistributedCache`]
//! with optional TTL enforcement. Both keep atomic operation counters so
//! coherence tests can prove which tiers a call touched.
//!
//! These backends are meant for development and tests; production backends
//! wrap real store/cache clients behind the same traits.

mod cache;
mod store;
mod transaction;

pub use cache::{CacheOptions, CacheStats, MemoryCache};
pub use store::{MemoryStore, StoreStats};
pub use transaction::MemoryTransaction;
