//! # VDR Errors
//!
//! This module defines the error types used by the VDR client, including for
//! the [`Node`](crate::Node) trait that may be implemented in other crates.
//!
//! Every error carries one of a small set of codes ([`Err`]) so callers can
//! decide whether to fix their input, retry, or give up, plus free-form context
//! describing what was being attempted.

use std::fmt::Display;

use thiserror::Error;

/// Simplify creation of errors with tracing.
///
/// # Example
/// ```
/// use credibil_vdr::error::Err;
/// use credibil_vdr::{tracerr, Result};
///
/// fn with_msg() -> Result<()> {
///     tracerr!(Err::InvalidStructure, "message: {}", "some message")
/// }
///
/// fn no_msg() -> Result<()> {
///     tracerr!(Err::InvalidStructure)
/// }
/// ```
#[macro_export]
macro_rules! tracerr {
    // with context
    ($code:expr, $($msg:tt)*) => {
        {
        use $crate::error::Context as _;
        tracing::error!($($msg)*);
        return Err($code).context(format!($($msg)*));
        }
    };
    // no context
    ($code:expr) => {
        {
        tracing::error!("{}", $code);
        return Err($code.into());
        }
    }
}

/// Public error type for the VDR client.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(#[from] anyhow::Error);

impl Error {
    /// Transfer the error to a JSON object with a code and a description.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.code().map_or_else(|| self.0.root_cause().to_string(), |c| c.to_string()),
            "error_description": self.to_string(),
        })
    }

    /// Returns true if the error was raised with the given code.
    #[must_use]
    pub fn is(&self, err: Err) -> bool {
        self.code() == Some(err)
    }

    /// The code the error was raised with, if any.
    #[must_use]
    pub fn code(&self) -> Option<Err> {
        self.0.downcast_ref::<Err>().copied()
    }

    /// Transient failures that are safe to retry with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is(Err::NetworkError)
    }
}

/// Typed error codes.
#[derive(Clone, Copy, Error, Debug, PartialEq, Eq)]
pub enum Err {
    /// Malformed input to a builder or codec. The caller must fix the input;
    /// never retried.
    #[error("invalid_structure")]
    InvalidStructure,

    /// A lifecycle precondition was violated, such as submitting a
    /// transaction before all required signatures are attached.
    #[error("invalid_state")]
    InvalidState,

    /// The resolution target does not exist on the ledger.
    #[error("not_found")]
    NotFound,

    /// Transient transport failure. Safe to retry.
    #[error("network_error")]
    NetworkError,

    /// The ledger rejected or reverted the transaction, including nonce
    /// mismatches and access-control denials. The raw reason is in the
    /// context.
    #[error("contract_error")]
    ContractError,

    /// Unexpected encode/decode failure, including ABI schema mismatches and
    /// malformed node responses.
    #[error("internal_error")]
    InternalError,
}

/// Context is used to decorate errors with useful context information.
pub trait Context<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Adds context to the error.
    ///
    /// # Errors
    ///
    /// * Original error with context appended.
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static;
}

impl<T, E> Context<T, E> for core::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Ok(ok) => Ok(ok),
            Err(e) => Err(Error(anyhow::Error::from(e).context(context))),
        }
    }
}

impl From<Err> for Error {
    fn from(error: Err) -> Self {
        Self(error.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self(anyhow::Error::from(Err::InternalError).context(err.to_string()))
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Self(anyhow::Error::from(Err::InvalidStructure).context(err.to_string()))
    }
}

impl From<ethabi::Error> for Error {
    fn from(err: ethabi::Error) -> Self {
        Self(anyhow::Error::from(Err::InvalidStructure).context(err.to_string()))
    }
}

impl From<alloy_rlp::Error> for Error {
    fn from(err: alloy_rlp::Error) -> Self {
        Self(anyhow::Error::from(Err::InvalidStructure).context(err.to_string()))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self(anyhow::Error::from(Err::InvalidStructure).context(err.to_string()))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_decode() { Err::InternalError } else { Err::NetworkError };
        Self(anyhow::Error::from(code).context(err.to_string()))
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::Result;

    #[test]
    fn base_err() {
        let err: Error = Err::InvalidStructure.into();

        assert_eq!(
            err.to_json(),
            json!({"error":"invalid_structure","error_description":"invalid_structure"})
        );
    }

    #[test]
    fn context_err() {
        let res: Result<()> = Err(Err::NotFound).context("schema does not exist");
        let err = res.expect_err("expected error");

        assert!(err.is(Err::NotFound));
        assert!(!err.is(Err::ContractError));
        assert_eq!(
            err.to_json(),
            json!({"error":"not_found","error_description":"schema does not exist"})
        );
    }

    #[test]
    fn retryable() {
        let err: Error = Err::NetworkError.into();
        assert!(err.is_retryable());
        let err: Error = Err::ContractError.into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn converted_errors_carry_codes() {
        let err: Error = hex::decode("zz").expect_err("should fail").into();
        assert!(err.is(Err::InvalidStructure));

        let err: Error =
            serde_json::from_str::<serde_json::Value>("{").expect_err("should fail").into();
        assert!(err.is(Err::InternalError));
    }

    #[test]
    fn test_macro() {
        let Err(e) = run_macro() else {
            panic!("expected error");
        };

        assert_eq!(e.to_string(), "test me");
        assert!(e.is(Err::InvalidState));
    }

    fn run_macro() -> Result<()> {
        tracerr!(Err::InvalidState, "test {}", "me")
    }
}
