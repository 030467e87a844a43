pub mod codec;
pub mod entity;
pub mod error;
pub mod key;
pub mod record;

pub use entity::Entity;
pub use error::{CoreError, Result};
pub use key::{Identity, Key, KeyId};
pub use record::Record;
