//! # stratum-context
//!
//! Request-scoped coherence orchestrator for the Stratum cache stack.
//!
//! A [`Context`] fronts three tiers in increasing order of latency and
//! durability: its own request-private [`LocalCache`], a shared
//! [`stratum_storage::DistributedCache`], and the authoritative
//! [`stratum_storage::PersistentStore`]. Reads are satisfied from the
//! fastest tier that holds the key and back-fill the faster tiers on the
//! way out; writes invalidate the distributed tier before the store commits.
//! Transactions bypass both cache tiers and reconcile the local tier only
//! after a successful commit.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stratum_context::{Context, Entity, Key, Record};
//!
//! let mut ctx = Context::new(store, cache);
//!
//! let mut entity = Entity::new(Key::incomplete_of::<Widget>(), widget);
//! ctx.put(&mut entity).await?;          // key is now complete
//!
//! let hit = ctx.key_get::<Widget>(entity.key.clone()).await?;
//! assert!(hit.src().is_some());         // served from the local tier
//! ```

mod context;
mod error;
mod local;

pub use context::{Context, ContextOptions, ContextStats};
pub use error::{CoherenceError, Result};
pub use local::LocalCache;

// Re-export the types a caller needs to talk to a context.
pub use stratum_core::{Entity, Identity, Key, KeyId, Record};
pub use stratum_storage::TransactionOptions;
