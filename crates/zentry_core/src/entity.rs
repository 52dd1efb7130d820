//! Typed entities over the generic put/get surface.

use crate::error::CoreResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zentry_codec::{from_cbor, to_cbor, LogicalKey};

/// Trait for plain, unversioned values stored under a `Current` key.
///
/// Accounts and accounting systems are entities: they are written with
/// [`crate::Store::put_entity`] and never produce historical records.
/// The default codec is CBOR.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Account {
///     id: String,
///     name: String,
/// }
///
/// impl Entity for Account {
///     fn logical_key(&self) -> CoreResult<LogicalKey> {
///         Ok(LogicalKey::new(format!("account:{}", self.id))?)
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned {
    /// Returns the key the entity is stored under.
    ///
    /// Must not change over the entity's lifetime.
    fn logical_key(&self) -> CoreResult<LogicalKey>;

    /// Encodes the entity.
    fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(to_cbor(self)?)
    }

    /// Decodes an entity.
    fn decode(bytes: &[u8]) -> CoreResult<Self> {
        Ok(from_cbor(bytes)?)
    }
}
