//! # Parameter Types
//!
//! Function and event descriptions parsed from canonical or human-readable
//! signatures. Parameter types are `ethabi`'s, restricted to the closed set
//! the registries use: addresses, `uint8`..=`uint256`, booleans, bytes,
//! `bytes1`..=`bytes32`, strings and arrays of those.

use std::str::FromStr;

pub use ethabi::{EventParam, ParamType};
use ethabi::param_type::Reader;

use super::{codec, Token};
use crate::error::{Err, Error};
use crate::tracerr;

/// Parse a Solidity type name such as `uint256` or `bytes32[]`.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the type is malformed or outside the
/// supported set (signed integers, tuples, odd widths).
pub fn param_type(name: &str) -> crate::Result<ParamType> {
    let kind = Reader::read(name.trim())?;
    check_supported(&kind)?;
    Ok(kind)
}

/// Check a parameter type is one the codec supports.
///
/// # Errors
///
/// Will fail with `InvalidStructure` for signed integers, tuples, `uintN` with
/// `N` not a multiple of 8 in 8..=256, and `bytesN` with `N` outside 1..=32.
pub fn check_supported(kind: &ParamType) -> crate::Result<()> {
    match kind {
        ParamType::Address | ParamType::Bool | ParamType::Bytes | ParamType::String => Ok(()),
        ParamType::Uint(bits) if (8..=256).contains(bits) && bits % 8 == 0 => Ok(()),
        ParamType::FixedBytes(len) if (1..=32).contains(len) => Ok(()),
        ParamType::Array(inner) | ParamType::FixedArray(inner, _) => check_supported(inner),
        _ => tracerr!(Err::InvalidStructure, "unsupported parameter type: {kind}"),
    }
}

/// A contract method.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    /// Method name.
    pub name: String,

    /// Input parameter types, in order.
    pub inputs: Vec<ParamType>,

    /// Output parameter types, in order.
    pub outputs: Vec<ParamType>,
}

impl Function {
    /// Canonical signature, e.g. `setAttribute(address,bytes32,bytes,uint256)`.
    #[must_use]
    pub fn signature(&self) -> String {
        canonical(&self.name, self.inputs.iter())
    }

    /// First four bytes of the keccak-256 hash of the canonical signature.
    #[must_use]
    pub fn selector(&self) -> [u8; 4] {
        ethabi::short_signature(&self.name, &self.inputs)
    }

    /// Encode a call: selector followed by the ABI-encoded arguments.
    ///
    /// # Errors
    ///
    /// Will fail if the arguments do not match the method's inputs.
    pub fn encode_input(&self, args: &[Token]) -> crate::Result<Vec<u8>> {
        let mut data = self.selector().to_vec();
        data.extend(codec::encode_params(&self.inputs, args)?);
        Ok(data)
    }

    /// Decode the arguments of call data produced by [`Function::encode_input`].
    ///
    /// # Errors
    ///
    /// Will fail if the selector does not match or the arguments cannot be
    /// decoded.
    pub fn decode_input(&self, data: &[u8]) -> crate::Result<Vec<Token>> {
        if data.len() < 4 || data[..4] != self.selector() {
            tracerr!(Err::InvalidStructure, "call data is not a call to {}", self.signature());
        }
        codec::decode(&self.inputs, &data[4..])
    }

    /// Decode the data returned by a call to this method.
    ///
    /// # Errors
    ///
    /// Will fail if the data does not match the method's outputs.
    pub fn decode_output(&self, data: &[u8]) -> crate::Result<Vec<Token>> {
        codec::decode(&self.outputs, data)
    }
}

impl FromStr for Function {
    type Err = Error;

    /// Parse a human-readable signature such as
    /// `function identityOwner(address identity) view returns (address)` or a
    /// canonical one such as `changed(address)`.
    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("function ").unwrap_or(s);
        let (name, inputs, rest) = split_signature(s)?;

        let outputs = match rest.find("returns") {
            Some(pos) => {
                let (_, outputs, _) = split_signature(&rest[pos + "returns".len()..])?;
                outputs.into_iter().map(|p| p.kind).collect()
            }
            None => vec![],
        };

        Ok(Self {
            name: name.to_string(),
            inputs: inputs.into_iter().map(|p| p.kind).collect(),
            outputs,
        })
    }
}

/// A contract event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event name.
    pub name: String,

    /// Parameters, in declaration order.
    pub inputs: Vec<EventParam>,
}

impl Event {
    /// Canonical signature, e.g. `DIDOwnerChanged(address,address,uint256)`.
    #[must_use]
    pub fn signature(&self) -> String {
        canonical(&self.name, self.inputs.iter().map(|p| &p.kind))
    }

    /// keccak-256 hash of the canonical signature (`topics[0]` of matching
    /// logs).
    #[must_use]
    pub fn topic(&self) -> [u8; 32] {
        let kinds = self.inputs.iter().map(|p| p.kind.clone()).collect::<Vec<_>>();
        ethabi::long_signature(&self.name, &kinds).to_fixed_bytes()
    }

    /// Decode a log emitted by this event into its parameters, in declaration
    /// order.
    ///
    /// # Errors
    ///
    /// Will fail if the topic count or first topic does not match the event,
    /// or the data cannot be decoded.
    pub fn decode_log(&self, topics: &[[u8; 32]], data: &[u8]) -> crate::Result<Vec<Token>> {
        codec::decode_event(self, topics, data)
    }
}

impl FromStr for Event {
    type Err = Error;

    /// Parse a human-readable event signature such as
    /// `event DIDOwnerChanged(address indexed identity, address owner, uint256 previousChange)`.
    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("event ").unwrap_or(s);
        let (name, inputs, _) = split_signature(s)?;
        Ok(Self {
            name: name.to_string(),
            inputs,
        })
    }
}

fn canonical<'a>(name: &str, params: impl Iterator<Item = &'a ParamType>) -> String {
    let params = params.map(ToString::to_string).collect::<Vec<_>>();
    format!("{name}({})", params.join(","))
}

// Split `name(type [indexed] [name], ...) rest` into its parts.
fn split_signature(s: &str) -> crate::Result<(&str, Vec<EventParam>, &str)> {
    let (Some(open), Some(close)) = (s.find('('), s.find(')')) else {
        tracerr!(Err::InvalidStructure, "invalid signature: {s}");
    };
    if close < open {
        tracerr!(Err::InvalidStructure, "invalid signature: {s}");
    }

    let name = s[..open].trim();
    let body = s[open + 1..close].trim();

    let mut params = vec![];
    if !body.is_empty() {
        for param in body.split(',') {
            let mut parts = param.split_whitespace();
            let Some(kind) = parts.next() else {
                tracerr!(Err::InvalidStructure, "empty parameter in signature: {s}");
            };
            let mut indexed = false;
            let mut name = String::new();
            for part in parts {
                match part {
                    "indexed" => indexed = true,
                    "memory" | "calldata" | "storage" => {}
                    other => name = other.to_string(),
                }
            }
            params.push(EventParam {
                name,
                kind: param_type(kind)?,
                indexed,
            });
        }
    }

    Ok((name, params, &s[close + 1..]))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_types() {
        assert_eq!(param_type("uint256").expect("should parse"), ParamType::Uint(256));
        assert_eq!(param_type("uint").expect("should parse"), ParamType::Uint(256));
        assert_eq!(
            param_type("address[]").expect("should parse"),
            ParamType::Array(Box::new(ParamType::Address))
        );
        assert_eq!(
            param_type("bytes32[2]").expect("should parse"),
            ParamType::FixedArray(Box::new(ParamType::FixedBytes(32)), 2)
        );
        assert_eq!(ParamType::FixedArray(Box::new(ParamType::FixedBytes(32)), 2).to_string(), "bytes32[2]");

        assert!(param_type("int256").expect_err("signed").is(Err::InvalidStructure));
        assert!(param_type("uint7").is_err());
        assert!(param_type("bytes33").is_err());
        assert!(param_type("(uint256,address)").is_err());
        assert!(param_type("int8[]").is_err());
    }

    #[test]
    fn selectors() {
        let f: Function = "function addValidator(address newValidator)".parse().expect("should parse");
        assert_eq!(f.selector(), [0x4d, 0x23, 0x8c, 0x8e]);

        let f: Function = "removeValidator(address)".parse().expect("should parse");
        assert_eq!(f.selector(), [0x40, 0xa1, 0x41, 0xff]);

        let f: Function =
            "function getValidators() view returns (address[])".parse().expect("should parse");
        assert_eq!(f.selector(), [0xb7, 0xab, 0x4d, 0xb5]);
        assert_eq!(f.outputs, vec![ParamType::Array(Box::new(ParamType::Address))]);

        let f: Function = "f(uint256,uint32[],bytes10,bytes)".parse().expect("should parse");
        assert_eq!(f.selector(), [0x8b, 0xe6, 0x52, 0x46]);
        assert_eq!(f.signature(), "f(uint256,uint32[],bytes10,bytes)");

        let err = "f(int256)".parse::<Function>().expect_err("signed integers are unsupported");
        assert!(err.is(Err::InvalidStructure));
    }

    #[test]
    fn event_topic() {
        let e: Event = "event Transfer(address indexed from, address indexed to, uint256 value)"
            .parse()
            .expect("should parse");
        assert_eq!(e.signature(), "Transfer(address,address,uint256)");
        assert_eq!(
            hex::encode(e.topic()),
            "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(e.topic(), crate::abi::topic(&e.signature()));
        assert!(e.inputs[0].indexed);
        assert!(!e.inputs[2].indexed);
        assert_eq!(e.inputs[2].name, "value");
    }
}
