//! The request-private local tier.

use std::collections::HashMap;

use stratum_core::Identity;

/// Request-lifetime map from identity to encoded envelope.
///
/// Pure in-memory, no I/O, no failure modes, no locking — a context is never
/// shared across requests. Entries never expire within the request; their
/// sole purpose is to avoid repeat distributed-cache and store calls.
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: HashMap<Identity, Vec<u8>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &Identity) -> Option<&[u8]> {
        self.entries.get(identity).map(Vec::as_slice)
    }

    pub fn put(&mut self, identity: Identity, encoded: Vec<u8>) {
        self.entries.insert(identity, encoded);
    }

    pub fn delete(&mut self, identity: &Identity) {
        self.entries.remove(identity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::Key;

    #[test]
    fn test_basic_operations() {
        let mut local = LocalCache::new();
        let identity = Key::new("Widget", 1u64).identity().unwrap();

        assert!(local.get(&identity).is_none());
        local.put(identity.clone(), b"enc".to_vec());
        assert_eq!(local.get(&identity).unwrap(), b"enc");
        assert_eq!(local.len(), 1);

        local.delete(&identity);
        assert!(local.is_empty());

        local.put(identity.clone(), b"enc".to_vec());
        local.clear();
        assert!(!local.contains(&identity));
    }
}
