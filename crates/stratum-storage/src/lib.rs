//! # stratum-storage
//!
//! Backend abstraction layer for the Stratum cache coherence stack.
//!
//! This crate defines the traits the coherence orchestrator depends on. It
//! contains no implementations — those are provided by separate crates
//! (`stratum-memory` ships in-memory backends for development and tests).
//!
//! ## Overview
//!
//! Two external tiers sit behind trait seams:
//! - [`PersistentStore`] — the authoritative, transactional key-value store
//!   ([`StoreTransaction`] is its native transaction handle).
//! - [`DistributedCache`] — the shared, lossy cache service, addressed by
//!   [`stratum_core::Identity`].
//!
//! Batch results are index-aligned with their input: a missing record shows
//! up as `StoreError::NotFound` in its slot, never as a call-level failure,
//! so other keys in the same batch still succeed.

mod error;
mod traits;
mod types;

pub use error::{CacheError, MultiError, StoreError};
pub use traits::{DistributedCache, PersistentStore, StoreTransaction};
pub use types::{PerKey, TransactionOptions};

/// Type alias for a store result.
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for a shared persistent-store trait object.
pub type DynStore = std::sync::Arc<dyn PersistentStore>;

/// Type alias for a shared distributed-cache trait object.
pub type DynCache = std::sync::Arc<dyn DistributedCache>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use stratum_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{CacheError, MultiError, StoreError};
    pub use crate::traits::{DistributedCache, PersistentStore, StoreTransaction};
    pub use crate::types::{PerKey, TransactionOptions};
    pub use crate::{DynCache, DynStore, StoreResult};
}
