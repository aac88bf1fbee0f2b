//! # Tokens
//!
//! Typed ABI values. [`Token`] is the serializable form used across the crate;
//! it converts to and from `ethabi::Token` at the codec boundary.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use super::ParamType;
use crate::core::hex_bytes;
use crate::error::{Err, Error};
use crate::tracerr;
use crate::types::Address;

/// A typed ABI value.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Token {
    /// Account address.
    Address(Address),

    /// Unsigned integer.
    Uint(U256),

    /// Boolean.
    Bool(bool),

    /// Dynamic byte string.
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),

    /// Fixed-size byte string.
    FixedBytes(#[serde(with = "hex_bytes")] Vec<u8>),

    /// UTF-8 string.
    String(String),

    /// Dynamic array.
    Array(Vec<Token>),

    /// Fixed-size array.
    FixedArray(Vec<Token>),
}

impl Token {
    /// Check the token can be encoded as the given type without truncation or
    /// padding beyond the declared width.
    #[must_use]
    pub fn type_check(&self, kind: &ParamType) -> bool {
        match (self, kind) {
            (Self::Address(_), ParamType::Address)
            | (Self::Bool(_), ParamType::Bool)
            | (Self::Bytes(_), ParamType::Bytes)
            | (Self::String(_), ParamType::String) => true,
            (Self::Uint(value), ParamType::Uint(bits)) => value.bits() <= *bits,
            (Self::FixedBytes(bytes), ParamType::FixedBytes(len)) => bytes.len() == *len,
            (Self::Array(items), ParamType::Array(inner)) => {
                items.iter().all(|item| item.type_check(inner))
            }
            (Self::FixedArray(items), ParamType::FixedArray(inner, len)) => {
                items.len() == *len && items.iter().all(|item| item.type_check(inner))
            }
            _ => false,
        }
    }

    /// Convenience constructor for `uintN` values that fit in 64 bits.
    #[must_use]
    pub fn uint(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }

    /// Convenience constructor for a `bytes32` value, right-padding shorter
    /// input with zeros.
    ///
    /// Returns `None` when the input is longer than 32 bytes.
    #[must_use]
    pub fn bytes32(value: &[u8]) -> Option<Self> {
        if value.len() > 32 {
            return None;
        }
        let mut padded = value.to_vec();
        padded.resize(32, 0);
        Some(Self::FixedBytes(padded))
    }
}

impl From<&Token> for ethabi::Token {
    fn from(token: &Token) -> Self {
        match token {
            Token::Address(address) => Self::Address(ethabi::Address::from(*address.as_bytes())),
            Token::Uint(value) => Self::Uint(ethabi::Uint::from_big_endian(&value.to_big_endian())),
            Token::Bool(value) => Self::Bool(*value),
            Token::Bytes(bytes) => Self::Bytes(bytes.clone()),
            Token::FixedBytes(bytes) => Self::FixedBytes(bytes.clone()),
            Token::String(value) => Self::String(value.clone()),
            Token::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            Token::FixedArray(items) => Self::FixedArray(items.iter().map(Self::from).collect()),
        }
    }
}

impl TryFrom<ethabi::Token> for Token {
    type Error = Error;

    fn try_from(token: ethabi::Token) -> crate::Result<Self> {
        let token = match token {
            ethabi::Token::Address(address) => Self::Address(Address::new(address.to_fixed_bytes())),
            ethabi::Token::Uint(value) => {
                let mut word = [0u8; 32];
                value.to_big_endian(&mut word);
                Self::Uint(U256::from_big_endian(&word))
            }
            ethabi::Token::Bool(value) => Self::Bool(value),
            ethabi::Token::Bytes(bytes) => Self::Bytes(bytes),
            ethabi::Token::FixedBytes(bytes) => Self::FixedBytes(bytes),
            ethabi::Token::String(value) => Self::String(value),
            ethabi::Token::Array(items) => {
                Self::Array(items.into_iter().map(Self::try_from).collect::<crate::Result<_>>()?)
            }
            ethabi::Token::FixedArray(items) => Self::FixedArray(
                items.into_iter().map(Self::try_from).collect::<crate::Result<_>>()?,
            ),
            other => tracerr!(Err::InvalidStructure, "unsupported value {other}"),
        };
        Ok(token)
    }
}

impl From<Address> for Token {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<U256> for Token {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<[u8; 32]> for Token {
    fn from(value: [u8; 32]) -> Self {
        Self::FixedBytes(value.to_vec())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn width_is_enforced() {
        assert!(Token::uint(255).type_check(&ParamType::Uint(8)));
        assert!(!Token::uint(256).type_check(&ParamType::Uint(8)));
        assert!(Token::Uint(U256::MAX).type_check(&ParamType::Uint(256)));
        assert!(!Token::FixedBytes(vec![1; 31]).type_check(&ParamType::FixedBytes(32)));
        assert!(!Token::Bool(true).type_check(&ParamType::Uint(8)));
    }

    #[test]
    fn nested_arrays() {
        let kind = ParamType::FixedArray(Box::new(ParamType::Address), 2);
        let token = Token::FixedArray(vec![Address::NULL.into(), Address::NULL.into()]);
        assert!(token.type_check(&kind));
        assert!(!Token::FixedArray(vec![Address::NULL.into()]).type_check(&kind));
        assert!(!Token::uint(1).type_check(&ParamType::Int(256)));
    }

    #[test]
    fn ethabi_conversion() {
        let owner = Address::new([0x22; 20]);
        let token = Token::Array(vec![
            Token::Address(owner),
            Token::Uint(U256::MAX),
            Token::FixedBytes(vec![7; 32]),
        ]);
        let converted = ethabi::Token::from(&token);
        let ethabi::Token::Array(items) = &converted else {
            panic!("expected array");
        };
        assert_eq!(items[0], ethabi::Token::Address(ethabi::Address::from([0x22; 20])));
        assert_eq!(items[1], ethabi::Token::Uint(ethabi::Uint::MAX));
        assert_eq!(Token::try_from(converted).expect("should convert"), token);

        let err = Token::try_from(ethabi::Token::Int(ethabi::Uint::one())).expect_err("signed");
        assert!(err.is(Err::InvalidStructure));
    }

    #[test]
    fn serialize_tagged() {
        let token = Token::Bytes(vec![0xde, 0xad]);
        let json = serde_json::to_value(&token).expect("should serialize");
        assert_eq!(json, serde_json::json!({"type": "bytes", "value": "0xdead"}));
        let back: Token = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(back, token);
    }
}
