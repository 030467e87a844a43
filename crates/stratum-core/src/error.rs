use thiserror::Error;

/// Core error types for Stratum key and envelope handling.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("incomplete key for kind {kind}: no id assigned yet")]
    IncompleteKey { kind: String },

    #[error("entity of kind {kind} carries no source value")]
    MissingSource { kind: String },

    #[error("invalid key: {message}")]
    InvalidKey { message: String },

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl CoreError {
    /// Create a new IncompleteKey error
    pub fn incomplete_key(kind: impl Into<String>) -> Self {
        Self::IncompleteKey { kind: kind.into() }
    }

    /// Create a new MissingSource error
    pub fn missing_source(kind: impl Into<String>) -> Self {
        Self::MissingSource { kind: kind.into() }
    }

    /// Create a new InvalidKey error
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Check if this error is a caller-input error (bad key or envelope,
    /// raised before any I/O)
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::IncompleteKey { .. } | Self::MissingSource { .. } | Self::InvalidKey { .. }
        )
    }
}

/// Type alias for core results.
pub type Result<T> = std::result::Result<T, CoreError>;
