//! # Roles
//!
//! Account roles managed by the `RoleControl` registry.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::builder::{Operation, Query, TransactionBuilder};
use crate::contract::{Registries, Registry};
use crate::error::Err;
use crate::tracerr;
use crate::types::{Address, Transaction};

/// Account role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Role {
    /// No role.
    #[default]
    Empty = 0,

    /// Manages roles and validators.
    Trustee = 1,

    /// May endorse (sponsor) transactions.
    Endorser = 2,

    /// Operates a validator node.
    Steward = 3,
}

impl Role {
    /// On-chain representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Role {
    type Error = crate::Error;

    fn try_from(value: u8) -> crate::Result<Self> {
        match value {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Trustee),
            2 => Ok(Self::Endorser),
            3 => Ok(Self::Steward),
            _ => tracerr!(Err::InternalError, "unknown role {value}"),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Build a transaction assigning `role` to `account`.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if `role` is `Empty` or `account` is the
/// null address.
pub fn build_assign_role(
    registries: &Registries, from: &Address, role: Role, account: &Address,
) -> crate::Result<Transaction> {
    let operation = Operation::AssignRole {
        role,
        account: *account,
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build a transaction revoking `role` from `account`.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if `role` is `Empty` or `account` is the
/// null address.
pub fn build_revoke_role(
    registries: &Registries, from: &Address, role: Role, account: &Address,
) -> crate::Result<Transaction> {
    let operation = Operation::RevokeRole {
        role,
        account: *account,
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build a read-only query of `account`'s role.
///
/// # Errors
///
/// Will fail if `RoleControl` is not configured.
pub fn build_get_role(registries: &Registries, account: &Address) -> crate::Result<Transaction> {
    TransactionBuilder::new(registries).build_query(&Query::GetRole { account: *account })
}

/// Parse the result of a [`build_get_role`] query.
///
/// # Errors
///
/// Will fail if the data is not a valid role.
pub fn parse_get_role(registries: &Registries, data: &[u8]) -> crate::Result<Role> {
    let output = registries.contract(Registry::RoleControl)?.decode_output("getRole", data)?;
    Role::try_from(output.u8(0)?)
}

/// Build a read-only query of whether `account` has `role`.
///
/// # Errors
///
/// Will fail if `RoleControl` is not configured.
pub fn build_has_role(
    registries: &Registries, role: Role, account: &Address,
) -> crate::Result<Transaction> {
    TransactionBuilder::new(registries).build_query(&Query::HasRole {
        role,
        account: *account,
    })
}

/// Parse the result of a [`build_has_role`] query.
///
/// # Errors
///
/// Will fail if the data is not a boolean.
pub fn parse_has_role(registries: &Registries, data: &[u8]) -> crate::Result<bool> {
    registries.contract(Registry::RoleControl)?.decode_output("hasRole", data)?.bool(0)
}
