//! # Verifiable Data Registry Client
//!
//! A client library for a blockchain-backed Verifiable Data Registry: a ledger
//! exposing registries for DID ownership and attributes, anoncreds schemas and
//! credential definitions, and role and validator control.
//!
//! The library builds transactions for registry operations, produces the data
//! an identity owner signs when an endorser submits on their behalf, submits
//! signed transactions and tracks their status, and resolves DIDs, schemas and
//! credential definitions by replaying the registries' events.
//!
//! Building, encoding and signature handling are synchronous and never touch
//! the network. Only the [`LedgerClient`] talks to a node, through the
//! [`Node`] trait.
//!
//! ```rust,ignore
//! let mut tx = build_set_attribute(client.registries(), &owner, &identity, &attribute, 86_400)?;
//! client.prepare_transaction(&mut tx).await?;
//! tx.set_signature(signer.sign(&tx.signing_bytes()?))?;
//! let tx_id = client.submit(&tx).await?;
//! ```

pub mod abi;
pub mod anoncreds;
pub mod builder;
pub mod client;
pub mod config;
pub mod contract;
pub mod core;
pub mod did;
pub mod endorsing;
pub mod error;
pub mod network;
pub mod types;

pub use self::anoncreds::{
    resolve_credential_definition, resolve_schema, CredentialDefinition, CredentialDefinitionId,
    Schema, SchemaId,
};
pub use self::builder::{Operation, Query, QueryOutput, TransactionBuilder};
pub use self::client::{HttpNode, LedgerClient, Node, SignedPayload};
pub use self::config::{ClientConfig, ContractConfig};
pub use self::contract::{Contract, ContractSpec, Registries, Registry};
pub use self::did::{resolve_did, Did, DidResolution, DidResolutionOptions};
pub use self::endorsing::build_endorsing_data;
pub use self::error::Error;
pub use self::network::Role;
pub use self::types::*;

/// Result type for the VDR client.
pub type Result<T, E = Error> = std::result::Result<T, E>;
