//! Property attribute flags.
//!
//! Each flag is a plain `bool` in memory and is written as the integer `0`
//! or `1` on the wire, which keeps serialized metadata compact and stable
//! across producers.

use serde::{Deserialize, Serialize};

/// Attribute flags of one own property.
///
/// `value` is set for data properties, `get` / `set` for accessor properties
/// that carry a getter or setter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyMeta {
    #[serde(with = "flag")]
    pub writable: bool,
    #[serde(with = "flag")]
    pub enumerable: bool,
    #[serde(with = "flag")]
    pub configurable: bool,
    #[serde(with = "flag")]
    pub value: bool,
    #[serde(with = "flag")]
    pub get: bool,
    #[serde(with = "flag")]
    pub set: bool,
}

impl PropertyMeta {
    /// Returns `true` for accessor (getter/setter) properties.
    pub fn is_accessor(&self) -> bool {
        self.get || self.set
    }
}

mod flag {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(de::Error::invalid_value(
                de::Unexpected::Unsigned(u64::from(other)),
                &"0 or 1",
            )),
        }
    }
}
