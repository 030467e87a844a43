//! The capability a user value type needs to move through the cache tiers.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A record-shaped user value.
///
/// The kind name is resolved at compile time through `KIND`, which also keys
/// the persistent store's keyspace. Serde bounds stand in for codec
/// registration: any `Record` type decodes without prior setup.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use stratum_core::Record;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Widget {
///     label: String,
/// }
///
/// impl Record for Widget {
///     const KIND: &'static str = "Widget";
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The kind name used for key construction.
    const KIND: &'static str;
}
