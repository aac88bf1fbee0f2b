//! # DID Registry Operations
//!
//! Transaction and query builders for the DID registry. Writes are sent by
//! the identity's current owner, or signed by the owner and submitted by an
//! endorser.

use primitive_types::U256;

use super::attribute::{DelegateType, DidAttribute};
use crate::builder::{Operation, Query, TransactionBuilder};
use crate::client::{LedgerClient, Node};
use crate::contract::{Registries, Registry};
use crate::types::{Address, Transaction, TransactionEndorsingData};

/// Build a transaction transferring control of `identity` to `new_owner`.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if either address is null.
pub fn build_change_owner(
    registries: &Registries, from: &Address, identity: &Address, new_owner: &Address,
) -> crate::Result<Transaction> {
    let operation = Operation::ChangeOwner {
        identity: *identity,
        new_owner: *new_owner,
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build a transaction adding a delegate valid for `validity` blocks (seconds
/// on registries with a timestamp [`ValidityClock`](crate::types::ValidityClock)).
///
/// # Errors
///
/// Will fail with `InvalidStructure` if `validity` is zero or an address is
/// null.
pub fn build_add_delegate(
    registries: &Registries, from: &Address, identity: &Address, delegate_type: DelegateType,
    delegate: &Address, validity: u64,
) -> crate::Result<Transaction> {
    let operation = Operation::AddDelegate {
        identity: *identity,
        delegate_type,
        delegate: *delegate,
        validity,
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build a transaction revoking a delegate.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if an address is null.
pub fn build_revoke_delegate(
    registries: &Registries, from: &Address, identity: &Address, delegate_type: DelegateType,
    delegate: &Address,
) -> crate::Result<Transaction> {
    let operation = Operation::RevokeDelegate {
        identity: *identity,
        delegate_type,
        delegate: *delegate,
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build a transaction setting an attribute valid for `validity` blocks
/// (seconds on registries with a timestamp validity clock).
///
/// # Errors
///
/// Will fail with `InvalidStructure` if `validity` is zero or the identity is
/// null.
pub fn build_set_attribute(
    registries: &Registries, from: &Address, identity: &Address, attribute: &DidAttribute,
    validity: u64,
) -> crate::Result<Transaction> {
    let operation = Operation::SetAttribute {
        identity: *identity,
        attribute: attribute.clone(),
        validity,
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build a transaction revoking an attribute.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the identity is null.
pub fn build_revoke_attribute(
    registries: &Registries, from: &Address, identity: &Address, attribute: &DidAttribute,
) -> crate::Result<Transaction> {
    let operation = Operation::RevokeAttribute {
        identity: *identity,
        attribute: attribute.clone(),
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build the endorsing data for changing the owner of `identity`.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if either address is null, or with the
/// client's error if the owner's nonce cannot be read.
pub async fn build_change_owner_endorsing_data<N: Node>(
    client: &LedgerClient<N>, identity: &Address, new_owner: &Address,
) -> crate::Result<TransactionEndorsingData> {
    let operation = Operation::ChangeOwner {
        identity: *identity,
        new_owner: *new_owner,
    };
    client.endorsing_data(&operation).await
}

/// Build the endorsing data for adding a delegate.
///
/// # Errors
///
/// Will fail as [`build_add_delegate`] does, or with the client's error if
/// the owner's nonce cannot be read.
pub async fn build_add_delegate_endorsing_data<N: Node>(
    client: &LedgerClient<N>, identity: &Address, delegate_type: DelegateType,
    delegate: &Address, validity: u64,
) -> crate::Result<TransactionEndorsingData> {
    let operation = Operation::AddDelegate {
        identity: *identity,
        delegate_type,
        delegate: *delegate,
        validity,
    };
    client.endorsing_data(&operation).await
}

/// Build the endorsing data for revoking a delegate.
///
/// # Errors
///
/// Will fail as [`build_revoke_delegate`] does, or with the client's error if
/// the owner's nonce cannot be read.
pub async fn build_revoke_delegate_endorsing_data<N: Node>(
    client: &LedgerClient<N>, identity: &Address, delegate_type: DelegateType,
    delegate: &Address,
) -> crate::Result<TransactionEndorsingData> {
    let operation = Operation::RevokeDelegate {
        identity: *identity,
        delegate_type,
        delegate: *delegate,
    };
    client.endorsing_data(&operation).await
}

/// Build the endorsing data for setting an attribute.
///
/// # Errors
///
/// Will fail as [`build_set_attribute`] does, or with the client's error if
/// the owner's nonce cannot be read.
pub async fn build_set_attribute_endorsing_data<N: Node>(
    client: &LedgerClient<N>, identity: &Address, attribute: &DidAttribute, validity: u64,
) -> crate::Result<TransactionEndorsingData> {
    let operation = Operation::SetAttribute {
        identity: *identity,
        attribute: attribute.clone(),
        validity,
    };
    client.endorsing_data(&operation).await
}

/// Build the endorsing data for revoking an attribute.
///
/// # Errors
///
/// Will fail as [`build_revoke_attribute`] does, or with the client's error
/// if the owner's nonce cannot be read.
pub async fn build_revoke_attribute_endorsing_data<N: Node>(
    client: &LedgerClient<N>, identity: &Address, attribute: &DidAttribute,
) -> crate::Result<TransactionEndorsingData> {
    let operation = Operation::RevokeAttribute {
        identity: *identity,
        attribute: attribute.clone(),
    };
    client.endorsing_data(&operation).await
}

/// Build a read-only query of the current owner of `identity`.
///
/// # Errors
///
/// Will fail if the DID registry is not configured.
pub fn build_identity_owner(registries: &Registries, identity: &Address) -> crate::Result<Transaction> {
    TransactionBuilder::new(registries).build_query(&Query::IdentityOwner { identity: *identity })
}

/// Parse the result of a [`build_identity_owner`] query.
///
/// # Errors
///
/// Will fail if the data is not an address.
pub fn parse_identity_owner(registries: &Registries, data: &[u8]) -> crate::Result<Address> {
    registries.contract(Registry::DidRegistry)?.decode_output("identityOwner", data)?.address(0)
}

/// Build a read-only query of the block `identity` last changed in.
///
/// # Errors
///
/// Will fail if the DID registry is not configured.
pub fn build_changed(registries: &Registries, identity: &Address) -> crate::Result<Transaction> {
    TransactionBuilder::new(registries).build_query(&Query::Changed { identity: *identity })
}

/// Parse the result of a [`build_changed`] query. Zero means the identity has
/// never changed.
///
/// # Errors
///
/// Will fail if the data is not a block number.
pub fn parse_changed(registries: &Registries, data: &[u8]) -> crate::Result<u64> {
    registries.contract(Registry::DidRegistry)?.decode_output("changed", data)?.u64(0)
}

/// Build a read-only query of the DID registry nonce of `account`.
///
/// # Errors
///
/// Will fail if the DID registry is not configured.
pub fn build_nonce(registries: &Registries, account: &Address) -> crate::Result<Transaction> {
    TransactionBuilder::new(registries).build_query(&Query::Nonce {
        registry: Registry::DidRegistry,
        account: *account,
    })
}

/// Parse the result of a [`build_nonce`] query.
///
/// # Errors
///
/// Will fail if the data is not an unsigned integer.
pub fn parse_nonce(registries: &Registries, data: &[u8]) -> crate::Result<U256> {
    registries.contract(Registry::DidRegistry)?.decode_output("nonce", data)?.uint(0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::abi::{encode, Token};
    use crate::error::Err;
    use crate::types::{Authorization, TransactionType};

    const IDENTITY: Address = Address::new([0xaa; 20]);

    fn registries() -> Registries {
        Registries::canonical(1337, [(Registry::DidRegistry, Address::new([0x33; 20]))])
            .expect("should build")
    }

    #[test]
    fn set_attribute_call_data() {
        let registries = registries();
        let attribute = DidAttribute::service("LinkedDomains", "https://example.com").expect("valid");
        let tx = build_set_attribute(&registries, &IDENTITY, &IDENTITY, &attribute, 86_400)
            .expect("should build");
        assert_eq!(tx.type_(), TransactionType::Write);
        assert_eq!(tx.authorization(), Authorization::Direct);
        assert_eq!(tx.to(), &Address::new([0x33; 20]));

        let contract = registries.contract(Registry::DidRegistry).expect("configured");
        let args = contract.function("setAttribute").expect("exists").decode_input(tx.data()).expect("should decode");
        assert_eq!(
            args,
            vec![
                Token::Address(IDENTITY),
                Token::bytes32(b"did/svc/LinkedDomains").expect("fits"),
                Token::Bytes(b"https://example.com".to_vec()),
                Token::uint(86_400),
            ]
        );
    }

    #[test]
    fn add_delegate_call_data() {
        let registries = registries();
        let delegate = Address::new([0xcc; 20]);
        let tx = build_add_delegate(&registries, &IDENTITY, &IDENTITY, DelegateType::SigAuth, &delegate, 100)
            .expect("should build");

        let contract = registries.contract(Registry::DidRegistry).expect("configured");
        let args = contract.function("addDelegate").expect("exists").decode_input(tx.data()).expect("should decode");
        assert_eq!(
            args,
            vec![
                Token::Address(IDENTITY),
                Token::FixedBytes(DelegateType::SigAuth.bytes32().to_vec()),
                Token::Address(delegate),
                Token::uint(100),
            ]
        );
    }

    #[test]
    fn zero_validity_is_rejected() {
        let attribute = DidAttribute::service("LinkedDomains", "https://example.com").expect("valid");
        let err = build_set_attribute(&registries(), &IDENTITY, &IDENTITY, &attribute, 0)
            .expect_err("should fail");
        assert!(err.is(Err::InvalidStructure));
    }

    #[test]
    fn queries() {
        let registries = registries();
        let tx = build_changed(&registries, &IDENTITY).expect("should build");
        assert_eq!(tx.type_(), TransactionType::Read);

        assert_eq!(parse_changed(&registries, &encode(&[Token::uint(42)])).expect("should parse"), 42);
        assert_eq!(
            parse_identity_owner(&registries, &encode(&[Token::Address(IDENTITY)])).expect("should parse"),
            IDENTITY
        );
        assert_eq!(parse_nonce(&registries, &encode(&[Token::uint(3)])).expect("should parse"), U256::from(3));

        let err = parse_changed(&registries, &[0u8; 5]).expect_err("short data");
        assert!(err.is(Err::InvalidStructure));
    }
}
