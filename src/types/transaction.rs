//! # Transaction
//!
//! An unsigned (then signed) call to one of the registries, plus the envelope
//! metadata needed to submit it as a legacy EIP-155 transaction.

use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use alloy_rlp::{Encodable, Header};
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Address, Authorization, SignatureData, Signatures};
use crate::abi::keccak256;
use crate::contract::Registry;
use crate::core::{decode_hash, hex_bytes};
use crate::error::{Err, Error};
use crate::tracerr;

/// Default gas limit for registry writes.
pub const DEFAULT_GAS: u64 = 1_000_000;

/// Whether the transaction mutates ledger state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    /// Read-only call, executed with `eth_call`.
    Read,

    /// State-changing transaction.
    #[default]
    Write,
}

/// The kind of domain operation a transaction carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    /// DID ownership, delegate and attribute operations.
    #[default]
    Did,

    /// Schema operations.
    Schema,

    /// Credential definition operations.
    CredentialDefinition,

    /// Role and validator control.
    Network,
}

/// The endorsement embedded in a sponsored transaction, kept so the nonce it
/// consumed can be checked before submission.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endorsement {
    /// Registry whose nonce the endorsement consumes.
    pub registry: Registry,

    /// Identity the operation acts for.
    pub identity: Address,

    /// Account the registry keys the nonce by.
    pub nonce_key: Address,

    /// Nonce the endorsement was signed over.
    pub nonce: U256,
}

/// A registry transaction.
///
/// Everything except the signatures (and a nonce left unset at build time) is
/// fixed when the transaction is built.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type")]
    pub(crate) type_: TransactionType,
    pub(crate) kind: TransactionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) from: Option<Address>,
    pub(crate) to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) nonce: Option<u64>,
    pub(crate) chain_id: u64,
    #[serde(with = "hex_bytes")]
    pub(crate) data: Vec<u8>,
    pub(crate) gas: u64,
    pub(crate) gas_price: u64,
    pub(crate) authorization: Authorization,
    pub(crate) signatures: Signatures,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) endorsement: Option<Endorsement>,
}

impl Transaction {
    /// Read or write.
    #[must_use]
    pub const fn type_(&self) -> TransactionType {
        self.type_
    }

    /// The kind of operation.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Sender account.
    #[must_use]
    pub const fn from(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    /// Target contract.
    #[must_use]
    pub const fn to(&self) -> &Address {
        &self.to
    }

    /// Sender account nonce, if filled.
    #[must_use]
    pub const fn nonce(&self) -> Option<u64> {
        self.nonce
    }

    /// Chain the transaction is bound to.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Encoded call data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Gas limit.
    #[must_use]
    pub const fn gas(&self) -> u64 {
        self.gas
    }

    /// Gas price.
    #[must_use]
    pub const fn gas_price(&self) -> u64 {
        self.gas_price
    }

    /// Direct or sponsored.
    #[must_use]
    pub const fn authorization(&self) -> Authorization {
        self.authorization
    }

    /// Signatures attached so far.
    #[must_use]
    pub const fn signatures(&self) -> &Signatures {
        &self.signatures
    }

    /// The embedded endorsement of a sponsored transaction.
    #[must_use]
    pub const fn endorsement(&self) -> Option<&Endorsement> {
        self.endorsement.as_ref()
    }

    /// Fill the sender's account nonce.
    ///
    /// Changing the nonce invalidates the envelope signature, so any attached
    /// envelope signature is dropped.
    pub fn set_nonce(&mut self, nonce: u64) {
        if self.nonce != Some(nonce) {
            match self.authorization {
                Authorization::Direct => self.signatures.identity = None,
                Authorization::Sponsored => self.signatures.endorser = None,
            }
        }
        self.nonce = Some(nonce);
    }

    /// The 32 bytes the sender must sign: keccak-256 of the EIP-155 signing
    /// RLP.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` if the transaction is read-only or its
    /// nonce is not yet set.
    pub fn signing_bytes(&self) -> crate::Result<[u8; 32]> {
        if self.type_ == TransactionType::Read {
            tracerr!(Err::InvalidState, "read-only transactions are not signed");
        }
        let Some(nonce) = self.nonce else {
            tracerr!(Err::InvalidState, "transaction nonce must be set before signing");
        };
        Ok(keccak256(&self.signing_rlp(nonce)))
    }

    /// Attach the sender's signature over [`Transaction::signing_bytes`].
    ///
    /// Fills the identity slot of a direct transaction and the endorser slot of
    /// a sponsored one.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the signature is malformed or
    /// `InvalidState` if the transaction cannot be signed yet.
    pub fn set_signature(&mut self, signature: SignatureData) -> crate::Result<()> {
        signature.validate()?;
        if self.type_ == TransactionType::Read {
            tracerr!(Err::InvalidState, "read-only transactions are not signed");
        }
        if self.nonce.is_none() {
            tracerr!(Err::InvalidState, "transaction nonce must be set before signing");
        }

        match self.authorization {
            Authorization::Direct => self.signatures.identity = Some(signature),
            Authorization::Sponsored => {
                if self.signatures.identity.is_none() {
                    tracerr!(Err::InvalidState, "sponsored transaction has no endorsement");
                }
                self.signatures.endorser = Some(signature);
            }
        }
        Ok(())
    }

    /// Whether every required signature is attached and the envelope is
    /// complete.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.type_, TransactionType::Write)
            && self.nonce.is_some()
            && self.from.is_some()
            && self.signatures.is_submittable(self.authorization)
    }

    /// The signed RLP envelope sent to the node.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` if the transaction is not complete.
    pub fn raw(&self) -> crate::Result<Vec<u8>> {
        let (Some(nonce), Some(signature)) =
            (self.nonce, self.signatures.envelope(self.authorization))
        else {
            tracerr!(Err::InvalidState, "transaction is missing its nonce or signature");
        };
        if !self.is_complete() {
            tracerr!(Err::InvalidState, "transaction is missing required signatures");
        }
        signature.validate()?;

        // EIP-155: v = recovery_id + chain_id * 2 + 35
        let v = self
            .chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + u64::from(signature.recovery_id)));
        let Some(v) = v else {
            tracerr!(Err::InvalidStructure, "chain id {} is too large to sign for", self.chain_id);
        };

        let mut payload = self.envelope_fields(nonce);
        v.encode(&mut payload);
        trim_zeros(&signature.r()).encode(&mut payload);
        trim_zeros(&signature.s()).encode(&mut payload);
        Ok(rlp_list(&payload))
    }

    /// Identifier the node will assign the signed transaction.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidState` if the transaction is not complete.
    pub fn tx_id(&self) -> crate::Result<TxId> {
        Ok(TxId(keccak256(&self.raw()?)))
    }

    // EIP-155 signing preimage: the envelope fields followed by
    // `chain_id, 0, 0`.
    fn signing_rlp(&self, nonce: u64) -> Vec<u8> {
        let mut payload = self.envelope_fields(nonce);
        self.chain_id.encode(&mut payload);
        0u64.encode(&mut payload);
        0u64.encode(&mut payload);
        rlp_list(&payload)
    }

    // nonce, gas price, gas, to, value (always 0), data
    fn envelope_fields(&self, nonce: u64) -> Vec<u8> {
        let mut payload = Vec::new();
        nonce.encode(&mut payload);
        self.gas_price.encode(&mut payload);
        self.gas.encode(&mut payload);
        self.to.as_bytes().encode(&mut payload);
        0u64.encode(&mut payload);
        self.data.as_slice().encode(&mut payload);
        payload
    }
}

fn rlp_list(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut out);
    out.extend_from_slice(payload);
    out
}

// Big-endian integers are RLP-encoded without leading zeros.
fn trim_zeros(word: &[u8]) -> &[u8] {
    let start = word.iter().position(|b| *b != 0).unwrap_or(word.len());
    &word[start..]
}

/// Transaction identifier (hash of the signed envelope).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for TxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Debug for TxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for TxId {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Ok(Self(decode_hash(s)?))
    }
}

impl Serialize for TxId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
