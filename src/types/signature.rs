//! # Signatures
//!
//! Signatures are produced outside of this library. The library only says what
//! must be signed (see `signing_bytes` on transactions and endorsing data) and
//! consumes the resulting [`SignatureData`].

use serde::{Deserialize, Serialize};

use crate::core::byte_array;
use crate::error::Err;
use crate::tracerr;

/// A recoverable secp256k1 signature supplied by an external signer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureData {
    /// Recovery id (0 or 1).
    pub recovery_id: u8,

    /// Compact signature: `r ‖ s`.
    #[serde(with = "byte_array")]
    pub signature: [u8; 64],
}

impl SignatureData {
    /// Create signature data, checking the compact signature has the expected
    /// shape.
    ///
    /// # Errors
    ///
    /// Will fail if the signature is not 64 bytes or the recovery id is not 0
    /// or 1.
    pub fn new(recovery_id: u8, signature: &[u8]) -> crate::Result<Self> {
        let Ok(signature) = <[u8; 64]>::try_from(signature) else {
            tracerr!(Err::InvalidStructure, "signature must be 64 bytes, got {}", signature.len());
        };
        let sig = Self { recovery_id, signature };
        sig.validate()?;
        Ok(sig)
    }

    /// Check the recovery id is 0 or 1.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the recovery id is out of range.
    pub fn validate(&self) -> crate::Result<()> {
        if self.recovery_id > 1 {
            tracerr!(Err::InvalidStructure, "invalid recovery id {}", self.recovery_id);
        }
        Ok(())
    }

    /// The `r` component.
    #[must_use]
    pub fn r(&self) -> [u8; 32] {
        let mut r = [0u8; 32];
        r.copy_from_slice(&self.signature[..32]);
        r
    }

    /// The `s` component.
    #[must_use]
    pub fn s(&self) -> [u8; 32] {
        let mut s = [0u8; 32];
        s.copy_from_slice(&self.signature[32..64]);
        s
    }

    /// The `v` value expected by `*Signed` registry methods.
    #[must_use]
    pub const fn v(&self) -> u8 {
        27u8.saturating_add(self.recovery_id)
    }
}

/// Which party has to sign a transaction before it can be submitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Authorization {
    /// The identity sends the transaction itself.
    #[default]
    Direct,

    /// The identity authorized the operation off-chain and an endorser sends
    /// (and pays for) the transaction.
    Sponsored,
}

/// Two-slot signature container.
///
/// The identity slot holds the signature of the identity the operation acts
/// for. For direct transactions that is the envelope signature; for sponsored
/// transactions it is the endorsement already embedded in the call data and
/// the endorser slot holds the envelope signature.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signatures {
    /// Signature of the identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<SignatureData>,

    /// Signature of the endorser submitting on the identity's behalf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endorser: Option<SignatureData>,
}

impl Signatures {
    /// Whether the combination of filled slots can be submitted under the
    /// given authorization.
    #[must_use]
    pub const fn is_submittable(&self, authorization: Authorization) -> bool {
        match authorization {
            Authorization::Direct => self.identity.is_some() && self.endorser.is_none(),
            Authorization::Sponsored => self.identity.is_some() && self.endorser.is_some(),
        }
    }

    /// The signature over the transaction envelope, if present.
    #[must_use]
    pub const fn envelope(&self, authorization: Authorization) -> Option<&SignatureData> {
        match authorization {
            Authorization::Direct => self.identity.as_ref(),
            Authorization::Sponsored => self.endorser.as_ref(),
        }
    }
}
