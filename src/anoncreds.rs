//! # Anoncreds
//!
//! Schemas and credential definitions stored in the ledger's anoncreds
//! registries.

mod credential_definition;
mod schema;

pub use self::credential_definition::{
    build_create_credential_definition, build_create_credential_definition_endorsing_data,
    build_credential_definition_created, parse_credential_definition_created,
    resolve_credential_definition, CredentialDefinition, CredentialDefinitionId,
    CL_SIGNATURE_TYPE,
};
pub use self::schema::{
    build_create_schema, build_create_schema_endorsing_data, build_schema_created,
    parse_schema_created, resolve_schema, Schema, SchemaId,
};
