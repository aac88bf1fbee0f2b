//! # Account Address
//!
//! 20-byte ledger account address, rendered as lowercase `0x`-prefixed hex.

use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::error::{Err, Error};
use crate::tracerr;

/// Ledger account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// The null address. A DID owned by the null address is deactivated.
    pub const NULL: Self = Self([0u8; 20]);

    /// Create an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive the address controlled by an uncompressed secp256k1 public key
    /// (65 bytes with the `0x04` prefix, or the 64-byte point).
    ///
    /// # Errors
    ///
    /// Will fail if the key has an unexpected length.
    pub fn from_public_key(key: &[u8]) -> crate::Result<Self> {
        let point = match key.len() {
            65 if key[0] == 0x04 => &key[1..],
            64 => key,
            _ => tracerr!(Err::InvalidStructure, "unexpected public key length {}", key.len()),
        };
        let digest = Keccak256::digest(point);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Ok(Self(bytes))
    }

    /// Raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns `true` for the null address.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self == &Self::NULL
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) else {
            tracerr!(Err::InvalidStructure, "address must be 0x-prefixed: {s}");
        };
        if stripped.len() != 40 {
            tracerr!(Err::InvalidStructure, "address must be 20 bytes: {s}");
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(stripped, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_display() {
        let addr: Address =
            "0xF0E2DB6C8DC6C681BB5D6AD121A107F300E9B2B5".parse().expect("should parse");
        assert_eq!(addr.to_string(), "0xf0e2db6c8dc6c681bb5d6ad121a107f300e9b2b5");
        assert!(!addr.is_null());
        assert!(Address::NULL.is_null());
    }

    #[test]
    fn reject_malformed() {
        assert!("f0e2db6c8dc6c681bb5d6ad121a107f300e9b2b5".parse::<Address>().is_err());
        assert!("0xf0e2".parse::<Address>().is_err());
        let err = "0xzz0e2db6c8dc6c681bb5d6ad121a107f300e9b2b".parse::<Address>().unwrap_err();
        assert!(err.is(Err::InvalidStructure));
    }

    #[test]
    fn serde_as_string() {
        let addr = Address::new([0x11; 20]);
        let json = serde_json::to_string(&addr).expect("should serialize");
        assert_eq!(json, "\"0x1111111111111111111111111111111111111111\"");
        let back: Address = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back, addr);
    }
}
