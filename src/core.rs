//! # Core
//!
//! Serialization helpers shared across the crate.

use serde::{Deserialize, Serialize};

/// `Kind` allows serde to serialize/deserialize a string or an object.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Kind<T> {
    /// Simple string value
    String(String),

    /// Complex object value
    Object(T),
}

impl<T> Kind<T> {
    /// Returns `true` if the `Kind` is a simple string.
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Returns `true` if the `Kind` is an object.
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }
}

impl<T> From<String> for Kind<T> {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// `OneMany` allows serde to serialize/deserialize a single object or a set of
/// objects.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneMany<T> {
    /// Single object
    One(T),

    /// Set of objects
    Many(Vec<T>),
}

impl<T: Clone> OneMany<T> {
    /// Adds an object to the `OneMany`. If the `OneMany` is a single object, it is
    /// converted to a set of objects.
    pub fn add(&mut self, item: T) {
        match self {
            Self::One(one) => {
                *self = Self::Many(vec![one.clone(), item]);
            }
            Self::Many(many) => {
                many.push(item);
            }
        }
    }

    /// Returns the length of the `OneMany`.
    pub const fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(many) => many.len(),
        }
    }

    /// Returns `true` if the `OneMany` is an empty `Many`.
    pub const fn is_empty(&self) -> bool {
        match self {
            Self::One(_) => false,
            Self::Many(many) => many.is_empty(),
        }
    }
}

/// Serialize byte strings as `0x`-prefixed lowercase hex.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as `0x` hex.
    ///
    /// # Errors
    ///
    /// Will fail if the serializer fails.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    /// Deserialize `0x` hex (the prefix is optional) into bytes.
    ///
    /// # Errors
    ///
    /// Will fail if the value is not a hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Serialize 32-byte hashes as `0x`-prefixed lowercase hex.
pub mod hex_hash {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a hash as `0x` hex.
    ///
    /// # Errors
    ///
    /// Will fail if the serializer fails.
    pub fn serialize<S: Serializer>(hash: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        super::hex_bytes::serialize(hash, serializer)
    }

    /// Deserialize `0x` hex into a 32-byte hash.
    ///
    /// # Errors
    ///
    /// Will fail if the value is not a 32-byte hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode_hash(&s).map_err(serde::de::Error::custom)
    }
}

/// Serialize fixed-size byte arrays as a sequence of bytes. Sequences of any
/// other length are rejected on deserialization.
pub mod byte_array {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize the array as a byte sequence.
    ///
    /// # Errors
    ///
    /// Will fail if the serializer fails.
    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N], serializer: S,
    ) -> Result<S::Ok, S::Error> {
        bytes.as_slice().serialize(serializer)
    }

    /// Deserialize a byte sequence of exactly `N` bytes.
    ///
    /// # Errors
    ///
    /// Will fail if the value is not a byte sequence of length `N`.
    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        let len = bytes.len();
        <[u8; N]>::try_from(bytes).map_err(|_| {
            let expected = format!("{N} bytes");
            serde::de::Error::invalid_length(len, &expected.as_str())
        })
    }
}

/// Decode a hex string with an optional `0x` prefix.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the string is not valid hex.
pub fn decode_hex(s: &str) -> crate::Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(s)?)
}

/// Decode a 32-byte hash from hex with an optional `0x` prefix.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the string is not 32 bytes of hex.
pub fn decode_hash(s: &str) -> crate::Result<[u8; 32]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let mut hash = [0u8; 32];
    hex::decode_to_slice(s, &mut hash)?;
    Ok(hash)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn one_many() {
        let mut value = OneMany::One("a".to_string());
        value.add("b".to_string());
        assert_eq!(value.len(), 2);
        assert_eq!(serde_json::to_value(&value).expect("should serialize"), serde_json::json!(["a", "b"]));
    }

    #[test]
    fn hex_values() {
        assert_eq!(decode_hex("0x0102").expect("should decode"), vec![1, 2]);
        assert_eq!(decode_hex("0102").expect("should decode"), vec![1, 2]);
        assert!(decode_hash("0x0102").is_err());
    }

    #[test]
    fn fixed_arrays() {
        #[derive(Debug, serde::Deserialize, serde::Serialize)]
        struct Fixed {
            #[serde(with = "byte_array")]
            bytes: [u8; 4],
        }

        let fixed: Fixed = serde_json::from_str(r#"{"bytes":[1,2,3,4]}"#).expect("should deserialize");
        assert_eq!(fixed.bytes, [1, 2, 3, 4]);
        assert_eq!(
            serde_json::to_value(&fixed).expect("should serialize"),
            serde_json::json!({"bytes": [1, 2, 3, 4]})
        );
        let err = serde_json::from_str::<Fixed>(r#"{"bytes":[1,2,3]}"#).expect_err("too short");
        assert!(err.to_string().contains("invalid length 3"));
    }
}
