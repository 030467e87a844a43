//! Error types for the two external tiers.
//!
//! Per-key domain errors (a missing record in a batch) travel in
//! [`MultiError`] slots so batch callers can inspect each index
//! independently; call-level transport errors abort the whole operation.

use std::fmt;

use stratum_core::CoreError;

/// Errors raised by a persistent store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The distinguished per-key error: no record exists at the key.
    #[error("no such entity: {kind}/{id}")]
    NotFound {
        /// Kind of the missing record.
        kind: String,
        /// Display form of the missing key's id.
        id: String,
    },

    /// The caller handed the backend a key it cannot address.
    #[error("invalid key: {message}")]
    InvalidKey {
        /// Description of what is wrong with the key.
        message: String,
    },

    /// A transaction could not be started, committed or rolled back.
    #[error("transaction error: {message}")]
    Transaction {
        /// Description of the transaction error.
        message: String,
    },

    /// The backend could not be reached or refused the call.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the transport failure.
        message: String,
    },

    /// Value bytes could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// An internal backend error occurred.
    #[error("internal store error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `Transaction` error.
    #[must_use]
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is the per-key not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Codec(e) => Self::Codec(e),
            CoreError::IncompleteKey { kind } => Self::InvalidKey {
                message: format!("incomplete key for kind {kind}"),
            },
            other => Self::InvalidKey {
                message: other.to_string(),
            },
        }
    }
}

/// Errors raised by a distributed cache backend.
///
/// Best-effort operations (set, delete) treat these as degradation; get
/// treats them as hard failures because fall-through correctness depends on
/// knowing what the shared tier holds.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache service could not be reached or refused the call.
    #[error("cache unavailable: {message}")]
    Unavailable {
        /// Description of the transport failure.
        message: String,
    },

    /// An internal cache backend error occurred.
    #[error("internal cache error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl CacheError {
    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// An index-aligned batch error: slot `i` describes the outcome of input
/// key `i`. `None` slots succeeded.
#[derive(Debug, Default)]
pub struct MultiError {
    slots: Vec<Option<StoreError>>,
}

impl MultiError {
    /// Creates a multi-error with `len` succeeded slots.
    #[must_use]
    pub fn new(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self { slots }
    }

    /// Records an error for the slot at `index`.
    pub fn set(&mut self, index: usize, err: StoreError) {
        self.slots[index] = Some(err);
    }

    /// The error at `index`, if that slot failed.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StoreError> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Returns `true` if any slot failed.
    #[must_use]
    pub fn any(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Number of slots (equal to the batch size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over slots in input order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&StoreError>> {
        self.slots.iter().map(Option::as_ref)
    }

    /// Consumes the multi-error into its slot vector.
    #[must_use]
    pub fn into_slots(self) -> Vec<Option<StoreError>> {
        self.slots
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.slots.iter().filter(|s| s.is_some()).count();
        write!(f, "{failed} of {} keys failed", self.slots.len())?;
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(err) = slot {
                write!(f, "; [{i}] {err}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}
