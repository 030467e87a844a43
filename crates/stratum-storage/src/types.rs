//! Shared types for the backend traits.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Per-key result slots, index-aligned with the input key batch.
pub type PerKey<T> = Vec<Result<T, StoreError>>;

/// Options for a persistent-store transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOptions {
    /// How many times the backend may retry a contended commit before
    /// surfacing a transaction error.
    pub attempts: u32,
}

impl TransactionOptions {
    /// Sets the retry attempt budget.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self { attempts: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_options_default() {
        let options = TransactionOptions::default();
        assert_eq!(options.attempts, 1);
        assert_eq!(options.with_attempts(3).attempts, 3);
    }
}
