//! # Endorsing Data
//!
//! The payload an identity signs off-chain to authorize an endorser to submit
//! (and pay for) an operation on its behalf.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use super::{Address, SignatureData};
use crate::abi::{encode, keccak256, Token};
use crate::contract::Registry;
use crate::core::hex_hash;
use crate::error::Err;
use crate::tracerr;

/// Signable payload for a sponsored (meta-)transaction.
///
/// The hash binds the target contract, chain, nonce, identity, method and
/// arguments so a signature can never be replayed on another chain, contract
/// or nonce. The value is serializable so the signed artifact can be handed
/// to an unrelated endorser.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEndorsingData {
    /// Registry the operation targets.
    pub registry: Registry,

    /// Identity the operation acts for.
    pub identity: Address,

    /// Account the registry keys the nonce by (the identity's owner for the
    /// DID registry, the identity itself otherwise).
    pub nonce_key: Address,

    /// Target contract.
    pub to: Address,

    /// Chain identifier.
    pub chain_id: u64,

    /// Registry nonce of `nonce_key` at build time.
    pub nonce: U256,

    /// Unsigned method name, e.g. `setAttribute`.
    pub method: String,

    /// Method arguments following the identity.
    pub params: Vec<Token>,

    /// Canonical hash over all of the above.
    #[serde(with = "hex_hash")]
    pub hash: [u8; 32],

    /// The identity's signature over `hash`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureData>,
}

impl TransactionEndorsingData {
    /// Build endorsing data, computing its canonical hash.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Registry, identity: Address, nonce_key: Address, to: Address, chain_id: u64,
        nonce: U256, method: impl Into<String>, params: Vec<Token>,
    ) -> Self {
        let method = method.into();
        let hash = endorsement_hash(&to, chain_id, nonce, &identity, &method, &params);
        Self {
            registry,
            identity,
            nonce_key,
            to,
            chain_id,
            nonce,
            method,
            params,
            hash,
            signature: None,
        }
    }

    /// The 32 bytes the identity must sign.
    #[must_use]
    pub const fn signing_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Attach the identity's signature.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the signature is malformed or the
    /// hash no longer matches the payload, and with `InvalidState` if the data
    /// is already signed.
    pub fn set_signature(&mut self, signature: SignatureData) -> crate::Result<()> {
        signature.validate()?;
        self.verify_hash()?;
        if self.signature.is_some() {
            tracerr!(Err::InvalidState, "endorsing data is already signed");
        }
        self.signature = Some(signature);
        Ok(())
    }

    /// Check the hash still matches the payload (the data may have travelled
    /// through untrusted hands).
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` on mismatch.
    pub fn verify_hash(&self) -> crate::Result<()> {
        let expected = endorsement_hash(
            &self.to,
            self.chain_id,
            self.nonce,
            &self.identity,
            &self.method,
            &self.params,
        );
        if expected != self.hash {
            tracerr!(Err::InvalidStructure, "endorsing data hash does not match its payload");
        }
        Ok(())
    }
}

/// The canonical endorsement hash: keccak-256 of
/// `0x19 ‖ 0x00 ‖ to ‖ chainId ‖ nonce ‖ identity ‖ method ‖ abi(params)`.
///
/// Registries recompute this hash to recover the signer of a `*Signed` call.
#[must_use]
pub fn endorsement_hash(
    to: &Address, chain_id: u64, nonce: U256, identity: &Address, method: &str, params: &[Token],
) -> [u8; 32] {
    let mut message = vec![0x19, 0x00];
    message.extend_from_slice(to.as_bytes());
    message.extend_from_slice(&U256::from(chain_id).to_big_endian());
    message.extend_from_slice(&nonce.to_big_endian());
    message.extend_from_slice(identity.as_bytes());
    message.extend_from_slice(method.as_bytes());
    message.extend(encode(params));
    keccak256(&message)
}

#[cfg(test)]
mod test {
    use super::*;

    fn data(chain_id: u64, nonce: u64) -> TransactionEndorsingData {
        let identity = Address::new([0xaa; 20]);
        TransactionEndorsingData::new(
            Registry::DidRegistry,
            identity,
            identity,
            Address::new([0x33; 20]),
            chain_id,
            U256::from(nonce),
            "setAttribute",
            vec![Token::FixedBytes(vec![1; 32]), Token::Bytes(b"value".to_vec()), Token::uint(100)],
        )
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(data(1337, 0).hash, data(1337, 0).hash);
        assert_ne!(data(1337, 0).hash, data(1337, 1).hash);
        assert_ne!(data(1337, 0).hash, data(1, 0).hash);
    }

    #[test]
    fn signed_once() {
        let mut data = data(1337, 0);
        let sig = SignatureData::new(0, &[5; 64]).expect("should create");
        data.set_signature(sig.clone()).expect("should sign");
        let err = data.set_signature(sig).expect_err("already signed");
        assert!(err.is(Err::InvalidState));
    }

    #[test]
    fn tampering_is_detected() {
        let mut data = data(1337, 0);
        data.nonce = U256::from(9);
        let sig = SignatureData::new(0, &[5; 64]).expect("should create");
        let err = data.set_signature(sig).expect_err("hash mismatch");
        assert!(err.is(Err::InvalidStructure));
    }

    #[test]
    fn transport_agnostic() {
        let data = data(1337, 4);
        let json = serde_json::to_string(&data).expect("should serialize");
        let back: TransactionEndorsingData = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back, data);
        back.verify_hash().expect("hash should survive transport");
    }
}
