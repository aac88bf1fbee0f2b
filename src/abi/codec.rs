//! # Codec
//!
//! Standard head/tail ABI encoding via `ethabi`, with a strict decoding layer:
//! decoded data must re-encode to exactly the input (no trailing bytes, dirty
//! padding or lossy strings) and every value must fit its declared width.

use super::param::check_supported;
use super::{Event, ParamType, Token};
use crate::error::Err;
use crate::tracerr;

/// Encode tokens, checking them against the expected parameter types first.
///
/// # Errors
///
/// Will fail with `InvalidStructure` when the number of tokens differs from
/// the number of parameters, or a token does not fit its parameter type.
pub fn encode_params(params: &[ParamType], tokens: &[Token]) -> crate::Result<Vec<u8>> {
    if params.len() != tokens.len() {
        tracerr!(
            Err::InvalidStructure,
            "expected {} arguments, got {}",
            params.len(),
            tokens.len()
        );
    }
    for (i, (kind, token)) in params.iter().zip(tokens).enumerate() {
        if !token.type_check(kind) {
            tracerr!(Err::InvalidStructure, "argument {i} is not a valid {kind}");
        }
    }
    Ok(encode(tokens))
}

/// Encode tokens as an ABI tuple.
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let tokens = tokens.iter().map(ethabi::Token::from).collect::<Vec<_>>();
    ethabi::encode(&tokens)
}

/// Decode an ABI tuple of the given types.
///
/// # Errors
///
/// Will fail with `InvalidStructure` when the data is too short, offsets point
/// outside the data, the encoding is not canonical, or a value does not fit
/// its declared type.
pub fn decode(types: &[ParamType], data: &[u8]) -> crate::Result<Vec<Token>> {
    for kind in types {
        check_supported(kind)?;
    }

    let decoded = match ethabi::decode(types, data) {
        Ok(decoded) => decoded,
        Err(e) => tracerr!(Err::InvalidStructure, "cannot decode {} bytes: {e}", data.len()),
    };
    if ethabi::encode(&decoded) != data {
        tracerr!(Err::InvalidStructure, "data is not canonically encoded");
    }

    let tokens = decoded.into_iter().map(Token::try_from).collect::<crate::Result<Vec<_>>>()?;
    for (kind, token) in types.iter().zip(&tokens) {
        if !token.type_check(kind) {
            tracerr!(Err::InvalidStructure, "value does not fit in {kind}");
        }
    }
    Ok(tokens)
}

/// Decode an event log into its parameters, in declaration order.
///
/// Indexed dynamic and array parameters are only available as their
/// keccak-256 hash and are returned as `FixedBytes`.
///
/// # Errors
///
/// Will fail with `InvalidStructure` when the first topic is not the event's
/// topic, the topic count does not match the number of indexed parameters, or
/// the data cannot be decoded.
pub fn decode_event(event: &Event, topics: &[[u8; 32]], data: &[u8]) -> crate::Result<Vec<Token>> {
    let indexed = event.inputs.iter().filter(|p| p.indexed).count();
    if topics.len() != indexed + 1 {
        tracerr!(
            Err::InvalidStructure,
            "{} expects {} topics, got {}",
            event.name,
            indexed + 1,
            topics.len()
        );
    }
    if topics[0] != event.topic() {
        tracerr!(Err::InvalidStructure, "log is not a {} event", event.name);
    }

    let data_types =
        event.inputs.iter().filter(|p| !p.indexed).map(|p| p.kind.clone()).collect::<Vec<_>>();
    let mut values = decode(&data_types, data)?.into_iter();
    let mut topics = topics[1..].iter();

    let mut tokens = Vec::with_capacity(event.inputs.len());
    for param in &event.inputs {
        let token = if param.indexed {
            let Some(topic) = topics.next() else {
                tracerr!(Err::InvalidStructure, "missing topic for {}", param.name);
            };
            if param.kind.is_dynamic() || matches!(param.kind, ParamType::FixedArray(..)) {
                Token::FixedBytes(topic.to_vec())
            } else {
                let Some(token) = decode(&[param.kind.clone()], topic)?.pop() else {
                    tracerr!(Err::InvalidStructure, "empty topic value for {}", param.name);
                };
                token
            }
        } else {
            let Some(value) = values.next() else {
                tracerr!(Err::InvalidStructure, "missing value for {}", param.name);
            };
            value
        };
        tokens.push(token);
    }

    Ok(tokens)
}
