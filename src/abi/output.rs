//! # Decoded Output
//!
//! Typed accessors over decoded return values and event parameters. A value
//! missing or of the wrong type means the contract's ABI does not match what
//! the caller expected, which is reported as `InternalError`.

use primitive_types::U256;

use super::Token;
use crate::error::Err;
use crate::tracerr;
use crate::types::Address;

/// Decoded tokens with typed accessors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output(Vec<Token>);

impl Output {
    /// Number of decoded values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no decoded values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The underlying tokens.
    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        self.0
    }

    fn get(&self, index: usize) -> crate::Result<&Token> {
        let Some(token) = self.0.get(index) else {
            tracerr!(Err::InternalError, "missing output value at index {index}");
        };
        Ok(token)
    }

    /// Address at `index`.
    ///
    /// # Errors
    ///
    /// Will fail if the value is missing or is not an address.
    pub fn address(&self, index: usize) -> crate::Result<Address> {
        match self.get(index)? {
            Token::Address(address) => Ok(*address),
            other => tracerr!(Err::InternalError, "expected address at {index}, got {other:?}"),
        }
    }

    /// Unsigned integer at `index`.
    ///
    /// # Errors
    ///
    /// Will fail if the value is missing or is not an unsigned integer.
    pub fn uint(&self, index: usize) -> crate::Result<U256> {
        match self.get(index)? {
            Token::Uint(value) => Ok(*value),
            other => tracerr!(Err::InternalError, "expected uint at {index}, got {other:?}"),
        }
    }

    /// Unsigned integer at `index` that must fit in 64 bits (block numbers,
    /// nonces, timestamps).
    ///
    /// # Errors
    ///
    /// Will fail if the value is missing, is not an unsigned integer, or does
    /// not fit in 64 bits.
    pub fn u64(&self, index: usize) -> crate::Result<u64> {
        let value = self.uint(index)?;
        if value.bits() > 64 {
            tracerr!(Err::InternalError, "value at {index} does not fit in 64 bits");
        }
        Ok(value.low_u64())
    }

    /// Unsigned integer at `index` that must fit in 8 bits.
    ///
    /// # Errors
    ///
    /// Will fail if the value is missing, is not an unsigned integer, or does
    /// not fit in 8 bits.
    pub fn u8(&self, index: usize) -> crate::Result<u8> {
        let value = self.u64(index)?;
        let Ok(value) = u8::try_from(value) else {
            tracerr!(Err::InternalError, "value at {index} does not fit in 8 bits");
        };
        Ok(value)
    }

    /// Boolean at `index`.
    ///
    /// # Errors
    ///
    /// Will fail if the value is missing or is not a boolean.
    pub fn bool(&self, index: usize) -> crate::Result<bool> {
        match self.get(index)? {
            Token::Bool(value) => Ok(*value),
            other => tracerr!(Err::InternalError, "expected bool at {index}, got {other:?}"),
        }
    }

    /// Dynamic or fixed-size bytes at `index`.
    ///
    /// # Errors
    ///
    /// Will fail if the value is missing or is not a byte string.
    pub fn bytes(&self, index: usize) -> crate::Result<Vec<u8>> {
        match self.get(index)? {
            Token::Bytes(bytes) | Token::FixedBytes(bytes) => Ok(bytes.clone()),
            other => tracerr!(Err::InternalError, "expected bytes at {index}, got {other:?}"),
        }
    }

    /// `bytes32` at `index`.
    ///
    /// # Errors
    ///
    /// Will fail if the value is missing or is not a 32-byte fixed byte string.
    pub fn bytes32(&self, index: usize) -> crate::Result<[u8; 32]> {
        match self.get(index)? {
            Token::FixedBytes(bytes) if bytes.len() == 32 => {
                let mut out = [0u8; 32];
                out.copy_from_slice(bytes);
                Ok(out)
            }
            other => tracerr!(Err::InternalError, "expected bytes32 at {index}, got {other:?}"),
        }
    }

    /// String at `index`.
    ///
    /// # Errors
    ///
    /// Will fail if the value is missing or is not a string.
    pub fn string(&self, index: usize) -> crate::Result<String> {
        match self.get(index)? {
            Token::String(value) => Ok(value.clone()),
            other => tracerr!(Err::InternalError, "expected string at {index}, got {other:?}"),
        }
    }

    /// Array of addresses at `index`.
    ///
    /// # Errors
    ///
    /// Will fail if the value is missing or is not an array of addresses.
    pub fn address_array(&self, index: usize) -> crate::Result<Vec<Address>> {
        let (Token::Array(items) | Token::FixedArray(items)) = self.get(index)? else {
            tracerr!(Err::InternalError, "expected array at {index}");
        };
        items
            .iter()
            .map(|item| match item {
                Token::Address(address) => Ok(*address),
                other => tracerr!(Err::InternalError, "expected address in array, got {other:?}"),
            })
            .collect()
    }
}

impl From<Vec<Token>> for Output {
    fn from(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn typed_access() {
        let output = Output::from(vec![
            Token::uint(42),
            Token::String("schema".into()),
            Token::Array(vec![Token::Address(Address::NULL)]),
        ]);
        assert_eq!(output.u64(0).expect("should be uint"), 42);
        assert_eq!(output.u8(0).expect("should fit"), 42);
        assert_eq!(output.string(1).expect("should be string"), "schema");
        assert_eq!(output.address_array(2).expect("should be array"), vec![Address::NULL]);

        let err = output.address(0).expect_err("should fail");
        assert!(err.is(Err::InternalError));
        let err = output.bool(5).expect_err("should fail");
        assert!(err.is(Err::InternalError));
    }
}
