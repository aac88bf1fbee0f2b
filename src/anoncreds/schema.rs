//! # Schemas
//!
//! Anoncreds schemas: the set of attribute names a credential may carry.
//! Schemas are written once and never updated; the registry records the block
//! each was created in.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::abi::keccak256;
use crate::builder::{Operation, Query, TransactionBuilder};
use crate::client::{LedgerClient, Node};
use crate::contract::{Registries, Registry};
use crate::did::Did;
use crate::error::Err;
use crate::tracerr;
use crate::types::{Address, EventQuery, Transaction, TransactionEndorsingData};

/// Schema identifier: `<issuerId>/anoncreds/v0/SCHEMA/<name>/<version>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct SchemaId(String);

impl SchemaId {
    /// Build the identifier of a schema.
    #[must_use]
    pub fn new(issuer_id: &str, name: &str, version: &str) -> Self {
        Self(format!("{issuer_id}/anoncreds/v0/SCHEMA/{name}/{version}"))
    }

    /// The key the registry stores the schema under.
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

impl Display for SchemaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// An anoncreds schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// DID of the issuer that created the schema.
    pub issuer_id: String,

    /// Schema name.
    pub name: String,

    /// Schema version.
    pub version: String,

    /// Attribute names.
    pub attr_names: Vec<String>,
}

impl Schema {
    /// The schema's identifier.
    #[must_use]
    pub fn id(&self) -> SchemaId {
        SchemaId::new(&self.issuer_id, &self.name, &self.version)
    }

    /// The issuer's DID.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the issuer is not a valid DID.
    pub fn issuer(&self) -> crate::Result<Did> {
        self.issuer_id.parse()
    }

    /// Check the schema is well formed.
    ///
    /// # Errors
    ///
    /// Will fail with `InvalidStructure` if the issuer DID is invalid, the name
    /// or version is empty, or the attribute names are missing, empty or
    /// duplicated.
    pub fn validate(&self) -> crate::Result<()> {
        self.issuer()?;
        if self.name.is_empty() {
            tracerr!(Err::InvalidStructure, "schema name must not be empty");
        }
        if self.version.is_empty() {
            tracerr!(Err::InvalidStructure, "schema version must not be empty");
        }
        if self.attr_names.is_empty() {
            tracerr!(Err::InvalidStructure, "schema must have at least one attribute");
        }
        let mut seen = HashSet::new();
        for attr in &self.attr_names {
            if attr.is_empty() {
                tracerr!(Err::InvalidStructure, "schema attribute names must not be empty");
            }
            if !seen.insert(attr) {
                tracerr!(Err::InvalidStructure, "duplicate schema attribute {attr}");
            }
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

/// Build a transaction creating `schema`, sent by its issuer.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the schema is malformed.
pub fn build_create_schema(
    registries: &Registries, from: &Address, schema: &Schema,
) -> crate::Result<Transaction> {
    let operation = Operation::CreateSchema {
        schema: schema.clone(),
    };
    TransactionBuilder::new(registries).sender(*from).build(&operation)
}

/// Build the endorsing data for creating `schema` through an endorser.
///
/// # Errors
///
/// Will fail with `InvalidStructure` if the schema is malformed, or with the
/// client's error if the identity's nonce cannot be read.
pub async fn build_create_schema_endorsing_data<N: Node>(
    client: &LedgerClient<N>, schema: &Schema,
) -> crate::Result<TransactionEndorsingData> {
    let operation = Operation::CreateSchema {
        schema: schema.clone(),
    };
    client.endorsing_data(&operation).await
}

/// Build a read-only query of the block `id` was created in.
///
/// # Errors
///
/// Will fail if the schema registry is not configured.
pub fn build_schema_created(registries: &Registries, id: &SchemaId) -> crate::Result<Transaction> {
    TransactionBuilder::new(registries).build_query(&Query::SchemaCreated { id: id.hash() })
}

/// Parse the result of a [`build_schema_created`] query. Zero means the schema
/// does not exist.
///
/// # Errors
///
/// Will fail if the data is not a block number.
pub fn parse_schema_created(registries: &Registries, data: &[u8]) -> crate::Result<u64> {
    registries.contract(Registry::SchemaRegistry)?.decode_output("created", data)?.u64(0)
}

/// Resolve a schema by replaying its creation event.
///
/// # Errors
///
/// Will fail with `NotFound` if the schema was never created and with
/// `InternalError` if the creation event is missing or does not describe the
/// requested schema.
pub async fn resolve_schema<N: Node>(
    client: &LedgerClient<N>, id: &SchemaId,
) -> crate::Result<Schema> {
    tracing::debug!("resolve_schema: {id}");

    let created = client.query(&Query::SchemaCreated { id: id.hash() }).await?.block()?;
    if created == 0 {
        tracerr!(Err::NotFound, "schema {id} does not exist");
    }

    let contract = client.registries().contract(Registry::SchemaRegistry)?;
    let event = contract.event("SchemaCreated")?;
    let query = EventQuery::new(contract.address)
        .topic(0, vec![event.topic()])
        .topic(1, vec![id.hash()])
        .blocks(created, Some(created));

    let logs = client.query_all_events(&query).await?;
    let Some(log) = logs.first() else {
        tracerr!(Err::InternalError, "no SchemaCreated event for {id} at block {created}");
    };
    let output = contract.decode_log("SchemaCreated", log)?;
    let schema: Schema = serde_json::from_str(&output.string(2)?)?;

    if &schema.id() != id {
        tracerr!(Err::InternalError, "resolved schema {} does not match {id}", schema.id());
    }
    tracing::info!("resolved schema {id} created by {}", output.address(1)?);
    Ok(schema)
}
