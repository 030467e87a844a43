//! The entity envelope: the unit every tier operation moves.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::key::{Identity, Key};
use crate::record::Record;

/// A user value wrapped with its key and lookup outcome.
///
/// Envelopes are created by the caller (possibly with an incomplete key,
/// completed on first put) or materialized by the orchestrator for lookups.
/// `not_found` is set only by a get that determined no record exists at the
/// key; a not-found envelope carries no source value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Entity<T: Record> {
    pub key: Key,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub src: Option<T>,
    #[serde(default)]
    pub not_found: bool,
}

impl<T: Record> Entity<T> {
    /// Creates an envelope around a value to be stored.
    pub fn new(key: Key, src: T) -> Self {
        Self {
            key,
            src: Some(src),
            not_found: false,
        }
    }

    /// Creates a lookup envelope with no value yet.
    pub fn lookup(key: Key) -> Self {
        Self {
            key,
            src: None,
            not_found: false,
        }
    }

    /// The cache identity of this envelope's key. Errors on incomplete keys.
    pub fn identity(&self) -> Result<Identity> {
        self.key.identity()
    }

    pub fn src(&self) -> Option<&T> {
        self.src.as_ref()
    }

    pub fn into_src(self) -> Option<T> {
        self.src
    }

    /// The source value, required to be present (put path).
    pub fn require_src(&self) -> Result<&T> {
        self.src
            .as_ref()
            .ok_or_else(|| CoreError::missing_source(self.key.kind()))
    }

    pub fn is_not_found(&self) -> bool {
        self.not_found
    }

    /// Marks the envelope as a confirmed miss, dropping any stale value.
    pub fn mark_not_found(&mut self) {
        self.not_found = true;
        self.src = None;
    }

    /// Takes the lookup outcome from a decoded cached envelope, keeping this
    /// envelope's own key.
    pub fn absorb(&mut self, cached: Entity<T>) {
        self.src = cached.src;
        self.not_found = cached.not_found;
    }
}
