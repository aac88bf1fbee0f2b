//! # Wallet
//!
//! A secp256k1 account that signs transaction envelopes and endorsing data.

use credibil_vdr::{Address, SignatureData, Transaction, TransactionEndorsingData};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

/// A ledger account holding its signing key in memory.
#[derive(Clone, Debug)]
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    /// A wallet with a freshly generated key.
    #[must_use]
    pub fn new() -> Self {
        Self::from_key(SigningKey::random(&mut OsRng))
    }

    /// A wallet for a known 32-byte secret.
    ///
    /// # Errors
    ///
    /// Will fail if the secret is not a valid secp256k1 scalar.
    pub fn from_secret(secret: &[u8; 32]) -> anyhow::Result<Self> {
        Ok(Self::from_key(SigningKey::from_slice(secret)?))
    }

    fn from_key(signing_key: SigningKey) -> Self {
        let point = signing_key.verifying_key().to_encoded_point(false);
        let address =
            Address::from_public_key(point.as_bytes()).expect("should derive address from public key");
        Self { signing_key, address }
    }

    /// The account address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// A `did:ethr` DID for the account on `network`.
    #[must_use]
    pub fn did(&self, network: &str) -> String {
        format!("did:ethr:{network}:{}", self.address)
    }

    /// Sign a 32-byte prehash, returning a recoverable signature.
    ///
    /// # Errors
    ///
    /// Will fail if signing fails.
    pub fn sign(&self, hash: &[u8; 32]) -> anyhow::Result<SignatureData> {
        let (signature, recovery_id) = self.signing_key.sign_prehash_recoverable(hash)?;
        Ok(SignatureData::new(recovery_id.to_byte(), &signature.to_bytes())?)
    }

    /// Sign a transaction's envelope. The nonce must already be set.
    ///
    /// # Errors
    ///
    /// Will fail if the transaction cannot be signed yet.
    pub fn sign_transaction(&self, tx: &mut Transaction) -> anyhow::Result<()> {
        let signature = self.sign(&tx.signing_bytes()?)?;
        Ok(tx.set_signature(signature)?)
    }

    /// Sign endorsing data as its identity.
    ///
    /// # Errors
    ///
    /// Will fail if the data was tampered with or is already signed.
    pub fn endorse(&self, data: &mut TransactionEndorsingData) -> anyhow::Result<()> {
        let signature = self.sign(data.signing_bytes())?;
        Ok(data.set_signature(signature)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_address() {
        // secret key 1 controls the generator point's address
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let wallet = Wallet::from_secret(&secret).expect("should create wallet");
        assert_eq!(
            wallet.address(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse::<Address>().expect("should parse")
        );
    }

    #[test]
    fn recoverable_signature() {
        let wallet = Wallet::new();
        let signature = wallet.sign(&[7u8; 32]).expect("should sign");
        assert_eq!(signature.signature.len(), 64);
        assert!(signature.recovery_id < 2);
    }
}
