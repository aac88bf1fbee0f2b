//! # Endorsing
//!
//! Sponsored operations: the identity signs [`TransactionEndorsingData`]
//! off-chain and an endorser submits the signed variant of the method, paying
//! for the transaction.
//!
//! The registries protect endorsements against replay with a per-account
//! nonce. The DID registry keys it by the identity's current owner; the
//! anoncreds registries key it by the identity itself.

use primitive_types::U256;

use crate::builder::{Operation, Query};
use crate::client::{LedgerClient, Node};
use crate::contract::{Registries, Registry};
use crate::error::Err;
use crate::tracerr;
use crate::types::{Address, TransactionEndorsingData};

/// Build endorsing data for `operation` given the registry nonce of
/// `nonce_key`.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the operation is malformed or cannot
/// be endorsed (role and validator operations), and with `InvalidState` if
/// its registry is not configured.
pub fn build_endorsing_data(
    registries: &Registries, operation: &Operation, nonce_key: Address, nonce: U256,
) -> crate::Result<TransactionEndorsingData> {
    tracing::debug!("build_endorsing_data: {}", operation.method());

    operation.validate()?;
    let Some(identity) = operation.identity()? else {
        tracerr!(Err::InvalidStructure, "{} cannot be endorsed", operation.method());
    };
    let registry = operation.registry();
    let contract = registries.contract(registry)?;

    // the signed variant must exist for the payload to be usable
    contract.function(&format!("{}Signed", operation.method()))?;

    Ok(TransactionEndorsingData::new(
        registry,
        identity,
        nonce_key,
        contract.address,
        registries.chain_id(),
        nonce,
        operation.method(),
        operation.arguments()?,
    ))
}

impl<N: Node> LedgerClient<N> {
    /// The account the registry keys an identity's endorsement nonce by.
    ///
    /// # Errors
    ///
    /// Will fail with the client's error if the owner cannot be queried.
    pub async fn nonce_key(&self, registry: Registry, identity: &Address) -> crate::Result<Address> {
        if registry != Registry::DidRegistry {
            return Ok(*identity);
        }
        self.query(&Query::IdentityOwner {
            identity: *identity,
        })
        .await?
        .owner()
    }

    /// Current registry nonce of `account`.
    ///
    /// # Errors
    ///
    /// Will fail with the client's error if the nonce cannot be queried.
    pub async fn registry_nonce(&self, registry: Registry, account: &Address) -> crate::Result<U256> {
        self.query(&Query::Nonce {
            registry,
            account: *account,
        })
        .await?
        .nonce()
    }

    /// Fetch the identity's registry nonce and build endorsing data for
    /// `operation`.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the operation is malformed or
    /// cannot be endorsed, or with the client's error if the nonce cannot be
    /// read.
    pub async fn endorsing_data(
        &self, operation: &Operation,
    ) -> crate::Result<TransactionEndorsingData> {
        operation.validate()?;
        let Some(identity) = operation.identity()? else {
            tracerr!(Err::InvalidStructure, "{} cannot be endorsed", operation.method());
        };
        let registry = operation.registry();

        let nonce_key = self.nonce_key(registry, &identity).await?;
        let nonce = self.registry_nonce(registry, &nonce_key).await?;
        tracing::trace!("endorsing {} for {identity} at nonce {nonce}", operation.method());

        build_endorsing_data(self.registries(), operation, nonce_key, nonce)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::network::Role;

    fn registries() -> Registries {
        Registries::canonical(
            1337,
            [
                (Registry::DidRegistry, Address::new([0x10; 20])),
                (Registry::RoleControl, Address::new([0x20; 20])),
            ],
        )
        .expect("should build")
    }

    fn change_owner() -> Operation {
        Operation::ChangeOwner {
            identity: Address::new([0xaa; 20]),
            new_owner: Address::new([0xbb; 20]),
        }
    }

    #[test]
    fn deterministic_hash() {
        let registries = registries();
        let first = build_endorsing_data(&registries, &change_owner(), Address::new([0xaa; 20]), U256::from(7))
            .expect("should build");
        let second = build_endorsing_data(&registries, &change_owner(), Address::new([0xaa; 20]), U256::from(7))
            .expect("should build");
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.to, Address::new([0x10; 20]));
        assert_eq!(first.method, "changeOwner");
    }

    #[test]
    fn nonce_changes_hash() {
        let registries = registries();
        let first = build_endorsing_data(&registries, &change_owner(), Address::new([0xaa; 20]), U256::from(7))
            .expect("should build");
        let second = build_endorsing_data(&registries, &change_owner(), Address::new([0xaa; 20]), U256::from(8))
            .expect("should build");
        assert_ne!(first.hash, second.hash);
    }

    #[test]
    fn network_operations_cannot_be_endorsed() {
        let operation = Operation::AssignRole {
            role: Role::Endorser,
            account: Address::new([0x01; 20]),
        };
        let err = build_endorsing_data(&registries(), &operation, Address::new([0x01; 20]), U256::zero())
            .expect_err("should fail");
        assert!(err.is(Err::InvalidStructure));
    }
}
