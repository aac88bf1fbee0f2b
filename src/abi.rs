//! # ABI Codec
//!
//! Encodes typed arguments into contract call data and decodes return data and
//! event logs back into typed values.
//!
//! Encoding is deterministic and side-effect free. Decoding is strict: data
//! that is too short or not canonically encoded, offsets that point outside
//! the data, and values wider than their declared type are all rejected with
//! `InvalidStructure`.

mod codec;
mod output;
mod param;
mod token;

use sha3::{Digest, Keccak256};

pub use self::codec::{decode, decode_event, encode, encode_params};
pub use self::output::Output;
pub use self::param::{check_supported, param_type, Event, EventParam, Function, ParamType};
pub use self::token::Token;

/// keccak-256 hash of the input.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Method selector for a canonical signature such as `changed(address)`.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Event topic for a canonical signature such as
/// `DIDOwnerChanged(address,address,uint256)`.
#[must_use]
pub fn topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

/// Left-pad an address into a 32-byte topic, as emitted for indexed address
/// parameters.
#[must_use]
pub fn address_topic(address: &crate::types::Address) -> [u8; 32] {
    let mut topic = [0u8; 32];
    topic[12..].copy_from_slice(address.as_bytes());
    topic
}

const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Extract the message from `Error(string)` revert data, if that is what the
/// data holds.
#[must_use]
pub fn revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < 4 || data[..4] != REVERT_SELECTOR {
        return None;
    }
    let tokens = decode(&[ParamType::String], &data[4..]).ok()?;
    match tokens.into_iter().next() {
        Some(Token::String(reason)) => Some(reason),
        _ => None,
    }
}
