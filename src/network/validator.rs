//! # Validators
//!
//! The validator set managed by the `ValidatorControl` registry.

use crate::builder::{Operation, Query, TransactionBuilder};
use crate::contract::{Registries, Registry};
use crate::types::{Address, Transaction};

/// Build a transaction adding `validator` to the validator set.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if `validator` is the null address.
pub fn build_add_validator(
    registries: &Registries, from: &Address, validator: &Address,
) -> crate::Result<Transaction> {
    let operation = Operation::AddValidator {
        validator: *validator,
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build a transaction removing `validator` from the validator set.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if `validator` is the null address.
pub fn build_remove_validator(
    registries: &Registries, from: &Address, validator: &Address,
) -> crate::Result<Transaction> {
    let operation = Operation::RemoveValidator {
        validator: *validator,
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build a read-only query of the current validator set.
///
/// # Errors
///
/// Will fail if `ValidatorControl` is not configured.
pub fn build_get_validators(registries: &Registries) -> crate::Result<Transaction> {
    TransactionBuilder::new(registries).build_query(&Query::GetValidators)
}

/// Parse the result of a [`build_get_validators`] query.
///
/// # Errors
///
/// Will fail if the data is not an array of addresses.
pub fn parse_get_validators(registries: &Registries, data: &[u8]) -> crate::Result<Vec<Address>> {
    registries
        .contract(Registry::ValidatorControl)?
        .decode_output("getValidators", data)?
        .address_array(0)
}
