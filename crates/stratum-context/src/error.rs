//! Errors surfaced by the coherence orchestrator.

use stratum_core::CoreError;
use stratum_storage::{CacheError, MultiError, StoreError};

/// Errors returned by [`crate::Context`] operations.
///
/// Per-key misses travel in [`Partial`](Self::Partial) so batch callers can
/// inspect each slot while the other slots still carry valid data;
/// everything else aborts the operation.
#[derive(Debug, thiserror::Error)]
pub enum CoherenceError {
    /// Caller-input error: incomplete key, missing source value, codec
    /// failure. Raised before any I/O.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Call-level persistent store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Distributed cache read failure. Only reads surface this; best-effort
    /// invalidation and population failures are logged and tolerated.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// At least one key in the batch failed; slots are index-aligned with
    /// the input.
    #[error(transparent)]
    Partial(#[from] MultiError),
}

impl CoherenceError {
    /// The per-key slots, when this is a partial batch failure.
    #[must_use]
    pub fn partial(&self) -> Option<&MultiError> {
        match self {
            Self::Partial(merr) => Some(merr),
            _ => None,
        }
    }

    /// Returns `true` if this error means "the record does not exist":
    /// either a direct not-found or a batch in which every failed slot is a
    /// not-found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(err) => err.is_not_found(),
            Self::Partial(merr) => merr.iter().flatten().all(StoreError::is_not_found),
            _ => false,
        }
    }
}

/// Type alias for orchestrator results.
pub type Result<T> = std::result::Result<T, CoherenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = CoherenceError::from(StoreError::not_found("Widget", "1"));
        assert!(err.is_not_found());

        let mut merr = MultiError::new(2);
        merr.set(1, StoreError::not_found("Widget", "b"));
        let err = CoherenceError::from(merr);
        assert!(err.is_not_found());
        assert!(err.partial().unwrap().get(1).is_some());

        let mut merr = MultiError::new(2);
        merr.set(0, StoreError::unavailable("down"));
        merr.set(1, StoreError::not_found("Widget", "b"));
        assert!(!CoherenceError::from(merr).is_not_found());

        let err = CoherenceError::from(CacheError::unavailable("down"));
        assert!(!err.is_not_found());
    }
}
