//! Keys and cache identities.
//!
//! A [`Key`] names one record in the persistent store. Keys start out
//! incomplete when the caller has no id yet; the store assigns a numeric id
//! on first put. Only complete keys can be turned into an [`Identity`], the
//! string under which both cache tiers address the record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::record::Record;

/// The id component of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyId {
    /// No id assigned yet; the store allocates one on first put.
    Incomplete,
    /// Caller-chosen string id.
    Name(String),
    /// Store-assigned (or caller-chosen) numeric id.
    Id(u64),
}

impl KeyId {
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Incomplete)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => write!(f, "<incomplete>"),
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<u64> for KeyId {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

/// An opaque, store-issued record identifier: a kind, an id and an optional
/// ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    kind: String,
    id: KeyId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    parent: Option<Box<Key>>,
}

impl Key {
    /// Creates a key with the given kind and id.
    pub fn new(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            parent: None,
        }
    }

    /// Creates a key for a [`Record`] type, taking the kind from the type.
    pub fn of<T: Record>(id: impl Into<KeyId>) -> Self {
        Self::new(T::KIND, id)
    }

    /// Creates an incomplete key; the store assigns an id on first put.
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self::new(kind, KeyId::Incomplete)
    }

    /// Creates an incomplete key for a [`Record`] type.
    pub fn incomplete_of<T: Record>() -> Self {
        Self::incomplete(T::KIND)
    }

    /// Attaches an ancestor to this key.
    pub fn with_parent(mut self, parent: Key) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &KeyId {
        &self.id
    }

    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_deref()
    }

    /// True when this key and its whole ancestor chain carry assigned ids.
    pub fn is_complete(&self) -> bool {
        self.id.is_complete() && self.parent.as_ref().is_none_or(|p| p.is_complete())
    }

    /// Assigns a store-allocated numeric id to an incomplete key.
    ///
    /// Assigning to an already-complete key is a caller error; the store
    /// never reassigns ids.
    pub fn assign_id(&mut self, id: u64) -> Result<()> {
        if self.id.is_complete() {
            return Err(CoreError::invalid_key(format!(
                "key {}/{:?} already has an id",
                self.kind, self.id
            )));
        }
        self.id = KeyId::Id(id);
        Ok(())
    }

    /// Derives the canonical cache identity for this key.
    ///
    /// The encoding is deterministic and injective over complete keys: two
    /// distinct complete keys never map to the same identity. Incomplete
    /// keys have no identity.
    pub fn identity(&self) -> Result<Identity> {
        if !self.is_complete() {
            return Err(CoreError::incomplete_key(self.kind.clone()));
        }
        let mut buf = String::new();
        self.write_path(&mut buf);
        Ok(Identity(buf))
    }

    fn write_path(&self, buf: &mut String) {
        if let Some(parent) = &self.parent {
            parent.write_path(buf);
        }
        buf.push('/');
        push_escaped(buf, &self.kind);
        buf.push(',');
        match &self.id {
            KeyId::Id(id) => {
                buf.push('i');
                buf.push_str(&id.to_string());
            }
            KeyId::Name(name) => {
                buf.push('n');
                push_escaped(buf, name);
            }
            // unreachable behind the is_complete check in identity()
            KeyId::Incomplete => buf.push('?'),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent}/")?;
        }
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// Escapes the separator characters so kind and name strings cannot forge
// path structure.
fn push_escaped(buf: &mut String, s: &str) {
    for c in s.chars() {
        if matches!(c, '/' | ',' | '\\') {
            buf.push('\\');
        }
        buf.push(c);
    }
}

/// Deterministic string identity of a complete [`Key`]; the lookup key in
/// both the local and the distributed cache tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}
