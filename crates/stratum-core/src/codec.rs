//! Byte codec for envelopes and raw source values.
//!
//! The distributed tier stores whole encoded envelopes; the persistent tier
//! stores raw source values. Both use JSON so a value round-trips exactly
//! through either tier.

use crate::entity::Entity;
use crate::error::Result;
use crate::record::Record;

/// Encodes an envelope for the distributed cache tier.
pub fn encode_entity<T: Record>(entity: &Entity<T>) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(entity)?)
}

/// Decodes a distributed-cache value back into an envelope.
pub fn decode_entity<T: Record>(bytes: &[u8]) -> Result<Entity<T>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encodes a raw source value for the persistent store.
pub fn encode_src<T: Record>(src: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(src)?)
}

/// Decodes a persistent-store value.
pub fn decode_src<T: Record>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        label: String,
        tags: Vec<String>,
    }

    impl Record for Widget {
        const KIND: &'static str = "Widget";
    }

    #[test]
    fn test_entity_round_trip() {
        let entity = Entity::new(
            Key::of::<Widget>("w-1"),
            Widget {
                label: "sprocket".into(),
                tags: vec!["a".into(), "b".into()],
            },
        );
        let bytes = encode_entity(&entity).unwrap();
        let back: Entity<Widget> = decode_entity(&bytes).unwrap();
        assert_eq!(back.key, entity.key);
        assert_eq!(back.src(), entity.src());
        assert!(!back.is_not_found());
    }

    #[test]
    fn test_not_found_entity_round_trip() {
        let mut entity = Entity::<Widget>::lookup(Key::of::<Widget>(9u64));
        entity.mark_not_found();
        let bytes = encode_entity(&entity).unwrap();
        let back: Entity<Widget> = decode_entity(&bytes).unwrap();
        assert!(back.is_not_found());
        assert!(back.src().is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_entity::<Widget>(b"not json").is_err());
    }
}
