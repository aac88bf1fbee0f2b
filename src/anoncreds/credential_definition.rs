//! # Credential Definitions
//!
//! An issuer's public keys for issuing credentials against a schema.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SchemaId;
use crate::abi::keccak256;
use crate::builder::{Operation, Query, TransactionBuilder};
use crate::client::{LedgerClient, Node};
use crate::contract::{Registries, Registry};
use crate::did::Did;
use crate::error::Err;
use crate::tracerr;
use crate::types::{Address, EventQuery, Transaction, TransactionEndorsingData};

/// The only supported signature type.
pub const CL_SIGNATURE_TYPE: &str = "CL";

/// Credential definition identifier:
/// `<issuerId>/anoncreds/v0/CLAIM_DEF/<schemaId>/<tag>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CredentialDefinitionId(String);

impl CredentialDefinitionId {
    /// Build the identifier of a credential definition.
    #[must_use]
    pub fn new(issuer_id: &str, schema_id: &SchemaId, tag: &str) -> Self {
        Self(format!("{issuer_id}/anoncreds/v0/CLAIM_DEF/{schema_id}/{tag}"))
    }

    /// The key the registry stores the credential definition under.
    #[must_use]
    pub fn hash(&self) -> [u8; 32] {
        keccak256(self.0.as_bytes())
    }

    /// The identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CredentialDefinitionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CredentialDefinitionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An anoncreds credential definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinition {
    /// DID of the issuer.
    pub issuer_id: String,

    /// Schema the definition issues against.
    pub schema_id: SchemaId,

    /// Signature type; always `CL`.
    pub cred_def_type: String,

    /// Distinguishes definitions of one issuer for the same schema.
    pub tag: String,

    /// Public key material.
    pub value: Value,
}

impl CredentialDefinition {
    /// The definition's identifier.
    #[must_use]
    pub fn id(&self) -> CredentialDefinitionId {
        CredentialDefinitionId::new(&self.issuer_id, &self.schema_id, &self.tag)
    }

    /// The issuer's DID.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the issuer is not a valid DID.
    pub fn issuer(&self) -> crate::Result<Did> {
        self.issuer_id.parse()
    }

    /// Check the definition is well formed.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the issuer DID is invalid, the
    /// type is not `CL`, the tag or schema id is empty, or the value is not a
    /// JSON object.
    pub fn validate(&self) -> crate::Result<()> {
        self.issuer()?;
        if self.cred_def_type != CL_SIGNATURE_TYPE {
            tracerr!(Err::InvalidStructure, "unsupported signature type {}", self.cred_def_type);
        }
        if self.tag.is_empty() {
            tracerr!(Err::InvalidStructure, "credential definition tag must not be empty");
        }
        if self.schema_id.as_str().is_empty() {
            tracerr!(Err::InvalidStructure, "credential definition schema id must not be empty");
        }
        if !self.value.is_object() {
            tracerr!(Err::InvalidStructure, "credential definition value must be an object");
        }
        Ok(())
    }

    /// The JSON stored on-chain.
    ///
    /// # Errors
    ///
    /// Will fail with `InternalError` if serialization fails.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Build a transaction creating `credential_definition`, sent by its issuer.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the definition is malformed.
pub fn build_create_credential_definition(
    registries: &Registries, from: &Address, credential_definition: &CredentialDefinition,
) -> crate::Result<Transaction> {
    let operation = Operation::CreateCredentialDefinition {
        credential_definition: credential_definition.clone(),
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build the endorsing data for creating `credential_definition` through an
/// endorser.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the definition is malformed, or with
/// the client's error if the identity's nonce cannot be read.
pub async fn build_create_credential_definition_endorsing_data<N: Node>(
    client: &LedgerClient<N>, credential_definition: &CredentialDefinition,
) -> crate::Result<TransactionEndorsingData> {
    let operation = Operation::CreateCredentialDefinition {
        credential_definition: credential_definition.clone(),
    };
    client.endorsing_data(&operation).await
}

/// Build a read-only query of the block `id` was created in.
///
/// # Errors
///
/// Will fail if the credential definition registry is not configured.
pub fn build_credential_definition_created(
    registries: &Registries, id: &CredentialDefinitionId,
) -> crate::Result<Transaction> {
    TransactionBuilder::new(registries)
        .build_query(&Query::CredentialDefinitionCreated { id: id.hash() })
}

/// Parse the result of a [`build_credential_definition_created`] query. Zero
/// means the definition does not exist.
///
/// # Errors
///
/// Will fail if the data is not a block number.
pub fn parse_credential_definition_created(
    registries: &Registries, data: &[u8],
) -> crate::Result<u64> {
    registries
        .contract(Registry::CredentialDefinitionRegistry)?
        .decode_output("created", data)?
        .u64(0)
}

/// Resolve a credential definition by replaying its creation event.
///
/// # Errors
///
/// Will fail with `NotFound` if the definition was never created and with
/// `InternalError` if the creation event is missing or does not describe the
/// requested definition.
pub async fn resolve_credential_definition<N: Node>(
    client: &LedgerClient<N>, id: &CredentialDefinitionId,
) -> crate::Result<CredentialDefinition> {
    tracing::debug!("resolve_credential_definition: {id}");

    let query = Query::CredentialDefinitionCreated { id: id.hash() };
    let created = client.query(&query).await?.block()?;
    if created == 0 {
        tracerr!(Err::NotFound, "credential definition {id} does not exist");
    }

    let contract = client.registries().contract(Registry::CredentialDefinitionRegistry)?;
    let event = contract.event("CredentialDefinitionCreated")?;
    let query = EventQuery::new(contract.address)
        .topic(0, vec![event.topic()])
        .topic(1, vec![id.hash()])
        .blocks(created, Some(created));

    let logs = client.query_all_events(&query).await?;
    let Some(log) = logs.first() else {
        tracerr!(
            Err::InternalError,
            "no CredentialDefinitionCreated event for {id} at block {created}"
        );
    };
    let output = contract.decode_log("CredentialDefinitionCreated", log)?;
    let credential_definition: CredentialDefinition = serde_json::from_str(&output.string(2)?)?;

    if &credential_definition.id() != id {
        tracerr!(
            Err::InternalError,
            "resolved credential definition {} does not match {id}",
            credential_definition.id()
        );
    }
    Ok(credential_definition)
}
